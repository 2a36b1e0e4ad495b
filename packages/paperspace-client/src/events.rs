//! Machine event tracking.
//!
//! Every mutating machine call is acknowledged with a machine event that the
//! server advances on its own. [`classify`] maps one observed snapshot of an
//! event to an [`EventOutcome`]; the tracker polls until the outcome is
//! terminal.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::client::PaperspaceClient;
use crate::context::CallContext;
use crate::convergence::{poll_until, Step};
use crate::error::{PaperspaceError, Result};
use crate::types::MachineEvent;

pub const EVENT_STATE_DONE: &str = "done";
pub const EVENT_STATE_ERROR: &str = "error";

/// Key under which [`PaperspaceClient::machine_event_stats`] reports the
/// total number of events seen.
pub const TOTAL_EVENTS_KEY: &str = "_totalEventsProcessed";

/// What one snapshot of a machine event says about the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The operation finished cleanly.
    Succeeded,
    /// The server reported an explicit error message.
    Failed(String),
    /// `state` is `error`, with no message and no completion time. Whether
    /// the operation actually failed is unknown; it is treated as a failure
    /// and reported as ambiguous.
    Ambiguous,
    /// Still in flight.
    Pending,
}

impl EventOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventOutcome::Pending)
    }
}

/// Classify one snapshot of a machine event.
///
/// Rules, in order:
/// 1. `state == "done"` succeeds.
/// 2. A non-empty `error` fails with that message.
/// 3. A completion timestamp succeeds. The API labels some cleanly finished
///    operations `error` after the fact; `dtFinished` is what tells them
///    apart.
/// 4. `state == "error"` with neither is ambiguous.
/// 5. Anything else is still pending.
pub fn classify(event: &MachineEvent) -> EventOutcome {
    if event.state == EVENT_STATE_DONE {
        return EventOutcome::Succeeded;
    }
    if let Some(message) = event.error_message() {
        return EventOutcome::Failed(message.to_string());
    }
    if event.is_finished() {
        return EventOutcome::Succeeded;
    }
    if event.state == EVENT_STATE_ERROR {
        return EventOutcome::Ambiguous;
    }
    EventOutcome::Pending
}

impl PaperspaceClient {
    pub async fn get_machine_event(&self, event_id: &str) -> Result<MachineEvent> {
        self.get_json(&format!("machine-events/{}", event_id)).await
    }

    /// All machine events, optionally only those of one machine.
    pub async fn list_machine_events(
        &self,
        ctx: &CallContext,
        machine_id: Option<&str>,
    ) -> Result<Vec<MachineEvent>> {
        match machine_id {
            Some(id) => self.fetch_all(ctx, "machine-events", &[("machineId", id)]).await,
            None => self.fetch_all(ctx, "machine-events", &[]).await,
        }
    }

    /// Poll a machine event until it reaches a terminal outcome.
    ///
    /// Returns the final snapshot on success.
    pub async fn wait_for_event(&self, ctx: &CallContext, event_id: &str) -> Result<MachineEvent> {
        let settings = self.poll_policy().event;
        let subject = format!("event {}", event_id);

        let finished = poll_until(ctx, settings, &subject, |attempt| async move {
            let event = self.get_machine_event(event_id).await?;
            match classify(&event) {
                EventOutcome::Succeeded => Ok(Step::Done(event)),
                EventOutcome::Failed(message) => Err(PaperspaceError::OperationFailed {
                    event_id: event.id,
                    name: event.name,
                    message,
                }),
                EventOutcome::Ambiguous => {
                    warn!(
                        event_id = %event.id,
                        name = %event.name,
                        "Event in 'error' state without message or completion time"
                    );
                    Err(PaperspaceError::OperationAmbiguous {
                        event_id: event.id,
                        name: event.name,
                    })
                }
                EventOutcome::Pending => {
                    debug!(event_id, state = %event.state, attempt, "Event still in progress");
                    Ok(Step::Continue)
                }
            }
        })
        .await?;

        finished.ok_or_else(|| PaperspaceError::Timeout {
            subject,
            bound: settings.timeout,
        })
    }

    /// Wait out every unfinished event of a machine, one after another.
    ///
    /// Returns how many events had to be waited for. The first failure ends
    /// the drain.
    pub async fn drain_machine_events(&self, ctx: &CallContext, machine_id: &str) -> Result<usize> {
        let outstanding: Vec<MachineEvent> = self
            .list_machine_events(ctx, Some(machine_id))
            .await?
            .into_iter()
            .filter(|event| !event.is_finished())
            .collect();

        for event in &outstanding {
            info!(
                machine_id,
                event_id = %event.id,
                name = %event.name,
                "Waiting for machine event to complete"
            );
            self.wait_for_event(ctx, &event.id).await?;
        }

        Ok(outstanding.len())
    }

    /// Count events by name across the whole account.
    pub async fn machine_event_stats(&self, ctx: &CallContext) -> Result<BTreeMap<String, usize>> {
        let events = self.list_machine_events(ctx, None).await?;

        let mut stats = BTreeMap::new();
        for event in &events {
            *stats.entry(event.name.clone()).or_insert(0) += 1;
        }
        stats.insert(TOTAL_EVENTS_KEY.to_string(), events.len());

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(state: &str, error: Option<&str>, dt_finished: Option<&str>) -> MachineEvent {
        MachineEvent {
            id: "ev1".into(),
            name: "update".into(),
            state: state.into(),
            machine_id: "psm1".into(),
            error: error.map(str::to_string),
            dt_finished: dt_finished.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_done_succeeds() {
        assert_eq!(classify(&event("done", None, None)), EventOutcome::Succeeded);
    }

    #[test]
    fn test_running_without_error_continues() {
        assert_eq!(classify(&event("running", None, None)), EventOutcome::Pending);
        assert_eq!(classify(&event("pending", None, None)), EventOutcome::Pending);
    }

    #[test]
    fn test_error_message_fails_with_message() {
        assert_eq!(
            classify(&event("error", Some("x"), None)),
            EventOutcome::Failed("x".into())
        );
    }

    #[test]
    fn test_error_with_completion_time_succeeds() {
        assert_eq!(
            classify(&event("error", None, Some("2024-05-01T10:00:00.000Z"))),
            EventOutcome::Succeeded
        );
    }

    #[test]
    fn test_error_without_message_or_completion_is_ambiguous() {
        let outcome = classify(&event("error", None, None));
        assert_eq!(outcome, EventOutcome::Ambiguous);
        assert!(outcome.is_terminal());
    }

    #[test]
    fn test_empty_error_string_counts_as_absent() {
        assert_eq!(classify(&event("error", Some(""), None)), EventOutcome::Ambiguous);
        assert_eq!(classify(&event("running", Some(""), None)), EventOutcome::Pending);
    }

    #[test]
    fn test_message_wins_over_completion_time() {
        assert_eq!(
            classify(&event("error", Some("disk full"), Some("2024-05-01T10:00:00.000Z"))),
            EventOutcome::Failed("disk full".into())
        );
    }

    #[test]
    fn test_event_decodes_null_fields() {
        let event: MachineEvent = serde_json::from_str(
            r#"{"id":"ev1","name":"start","state":"error","machineId":"psm1","error":null,"dtFinished":null}"#,
        )
        .unwrap();
        assert_eq!(classify(&event), EventOutcome::Ambiguous);
    }
}
