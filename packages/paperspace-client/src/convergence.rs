//! Bounded fixed-interval polling.
//!
//! [`poll_until`] is the single waiting loop in the crate: the event tracker,
//! machine state transitions and post-delete existence checks are all built
//! on it. The first probe runs immediately and sleeps happen only between
//! probes. A wait ends after `settings.max_attempts()` probes or, for timed
//! settings, once `settings.timeout` has elapsed, whichever comes first.
//! Slow probes count against the timeout.

use std::future::Future;

use tokio::time::Instant;
use tracing::debug;

use crate::client::PaperspaceClient;
use crate::config::PollSettings;
use crate::context::CallContext;
use crate::error::{PaperspaceError, Result};
use crate::types::{Machine, TargetState};

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Done(T),
    Continue,
}

/// Run `probe` until it returns [`Step::Done`].
///
/// Returns `Ok(None)` when the attempts or the timeout run out. Probe
/// errors, cancellation and the context deadline end the wait immediately.
pub async fn poll_until<T, F, Fut>(
    ctx: &CallContext,
    settings: PollSettings,
    subject: &str,
    mut probe: F,
) -> Result<Option<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Step<T>>>,
{
    let max_attempts = settings.max_attempts();
    let give_up_at = if settings.timed {
        Instant::now().checked_add(settings.timeout)
    } else {
        None
    };

    for attempt in 1..=max_attempts {
        ctx.check(subject)?;

        if let Step::Done(value) = probe(attempt).await? {
            return Ok(Some(value));
        }
        debug!(subject, attempt, max_attempts, "Not converged yet");

        if attempt == max_attempts {
            break;
        }

        let pause = match give_up_at {
            Some(at) => settings
                .interval
                .min(at.saturating_duration_since(Instant::now())),
            None => settings.interval,
        };
        if pause.is_zero() {
            debug!(subject, attempt, "Poll timeout elapsed");
            break;
        }
        ctx.sleep(pause, subject).await?;

        if give_up_at.is_some_and(|at| Instant::now() >= at) {
            debug!(subject, attempt, "Poll timeout elapsed");
            break;
        }
    }

    Ok(None)
}

/// Poll `fetch` until `predicate` holds for the fetched value.
pub async fn converge<T, F, Fut, P>(
    ctx: &CallContext,
    settings: PollSettings,
    subject: &str,
    mut fetch: F,
    predicate: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let predicate = &predicate;
    let fetch = &mut fetch;
    let converged = poll_until(ctx, settings, subject, move |_| {
        let fetched = fetch();
        async move {
            let value = fetched.await?;
            Ok(if predicate(&value) {
                Step::Done(value)
            } else {
                Step::Continue
            })
        }
    })
    .await?;

    converged.ok_or_else(|| PaperspaceError::Timeout {
        subject: subject.to_string(),
        bound: settings.timeout,
    })
}

/// Poll `fetch` until it fails with 404.
///
/// Returns `Ok(false)` if the resource was still there after every attempt.
/// Errors other than 404 are propagated.
pub async fn wait_for_absence<T, F, Fut>(
    ctx: &CallContext,
    settings: PollSettings,
    subject: &str,
    mut fetch: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let gone = poll_until(ctx, settings, subject, |_| {
        let fetched = fetch();
        async move {
            match fetched.await {
                Ok(_) => Ok(Step::Continue),
                Err(e) if e.is_not_found() => Ok(Step::Done(())),
                Err(e) => Err(e),
            }
        }
    })
    .await?;

    Ok(gone.is_some())
}

impl PaperspaceClient {
    /// Wait until the machine reports `target`, returning that snapshot.
    ///
    /// A machine already in `target` costs exactly one fetch.
    pub async fn wait_for_machine_state(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        target: TargetState,
    ) -> Result<Machine> {
        let subject = format!("machine {} to reach state '{}'", machine_id, target);
        converge(
            ctx,
            self.poll_policy().machine_state,
            &subject,
            || self.get_machine(machine_id),
            |machine: &Machine| machine.is_in(target),
        )
        .await
    }
}
