//! Machine lifecycle protocols: create, update, start/stop, delete.
//!
//! Each protocol issues one mutating call and then waits for the server to
//! converge. Calls against one machine ID hold its lease for their whole
//! duration; the `*_locked` helpers assume the caller already holds it.

use std::future::Future;

use tracing::{debug, info};

use crate::client::PaperspaceClient;
use crate::config::PollSettings;
use crate::context::CallContext;
use crate::convergence::wait_for_absence;
use crate::error::{PaperspaceError, Result};
use crate::machines::update_body;
use crate::types::{Machine, MachineCreateConfig, MachineUpdateConfig, TargetState};

impl PaperspaceClient {
    /// Create a machine and wait until it exists (and is `ready` when
    /// `start_on_create` is set).
    ///
    /// The stub in the create response is never returned; the machine is
    /// re-fetched once everything has settled.
    pub async fn create_machine(
        &self,
        ctx: &CallContext,
        config: &MachineCreateConfig,
    ) -> Result<Machine> {
        let response = self.post_machine(config).await?;

        let machine_id = if response.data.id.is_empty() {
            response.event.machine_id.clone()
        } else {
            response.data.id.clone()
        };
        let _lease = self.locks().acquire(ctx, &machine_id).await?;

        info!(
            machine_id = %machine_id,
            event_id = %response.event.id,
            name = %response.event.name,
            "Waiting for machine event to complete"
        );
        self.wait_for_event(ctx, &response.event.id).await?;

        if config.start_on_create {
            info!(machine_id = %machine_id, "Waiting for machine to start");
            self.wait_for_machine_state(ctx, &machine_id, TargetState::Ready)
                .await?;
        }

        self.get_machine(&machine_id).await
    }

    /// Apply an update. An update with no fields set is a no-op and makes no
    /// API call; returns whether anything was sent.
    pub async fn update_machine(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        update: &MachineUpdateConfig,
    ) -> Result<bool> {
        let Some(body) = update_body(update)? else {
            info!(machine_id, "PUT request body is empty, nothing to update");
            return Ok(false);
        };

        let _lease = self.locks().acquire(ctx, machine_id).await?;
        self.update_machine_locked(ctx, machine_id, body).await?;
        Ok(true)
    }

    async fn update_machine_locked(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        body: serde_json::Value,
    ) -> Result<()> {
        let response = self.put_machine(machine_id, body).await?;
        debug!(machine_id, event_id = %response.event.id, "Update accepted");

        // The response names one event, but earlier actions may still be
        // running against the machine: wait for all of them.
        info!(machine_id, "Waiting for machine events to complete");
        let drained = self.drain_machine_events(ctx, machine_id).await?;
        debug!(machine_id, drained, "Machine events drained");

        Ok(())
    }

    /// Drive a machine to `target` (`ready` or `off`). Already there is a
    /// no-op. Returns the converged machine.
    pub async fn set_machine_state(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        target: TargetState,
    ) -> Result<Machine> {
        let _lease = self.locks().acquire(ctx, machine_id).await?;
        self.set_machine_state_locked(ctx, machine_id, target).await
    }

    pub async fn start_machine(&self, ctx: &CallContext, machine_id: &str) -> Result<Machine> {
        self.set_machine_state(ctx, machine_id, TargetState::Ready).await
    }

    pub async fn stop_machine(&self, ctx: &CallContext, machine_id: &str) -> Result<Machine> {
        self.set_machine_state(ctx, machine_id, TargetState::Off).await
    }

    async fn set_machine_state_locked(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        target: TargetState,
    ) -> Result<Machine> {
        let machine = self.get_machine(machine_id).await?;
        if machine.is_in(target) {
            info!(machine_id, state = %target, "Machine is already in target state");
            return Ok(machine);
        }

        self.patch_machine_action(machine_id, target).await?;

        info!(machine_id, action = target.action(), "Waiting for machine to reach target state");
        self.wait_for_machine_state(ctx, machine_id, target).await
    }

    /// Delete a machine and wait until it can no longer be fetched.
    ///
    /// A machine that is already gone counts as deleted.
    pub async fn delete_machine(&self, ctx: &CallContext, machine_id: &str) -> Result<()> {
        let _lease = self.locks().acquire(ctx, machine_id).await?;

        delete_and_confirm(
            ctx,
            "machine",
            machine_id,
            self.poll_policy().machine_delete,
            self.delete_machine_request(machine_id),
            || self.get_machine(machine_id),
        )
        .await
    }

    /// Full reconcile of an existing machine: stop it if the update resizes
    /// it, apply the update, then bring it to `desired`.
    ///
    /// Refused unless the machine is currently `off` or `ready`.
    pub async fn apply_machine_changes(
        &self,
        ctx: &CallContext,
        machine_id: &str,
        update: &MachineUpdateConfig,
        desired: TargetState,
    ) -> Result<Machine> {
        let _lease = self.locks().acquire(ctx, machine_id).await?;

        let current = self.get_machine(machine_id).await?;
        if !current.is_at_rest() {
            return Err(PaperspaceError::InvalidState {
                operation: "update",
                machine_id: machine_id.to_string(),
                state: current.state,
            });
        }

        if update.requires_stop(&current) {
            info!(machine_id, "Stopping machine before update");
            self.set_machine_state_locked(ctx, machine_id, TargetState::Off)
                .await?;
        }

        match update_body(update)? {
            Some(body) => self.update_machine_locked(ctx, machine_id, body).await?,
            None => info!(machine_id, "PUT request body is empty, nothing to update"),
        }

        info!(machine_id, state = %desired, "Ensuring machine state");
        self.set_machine_state_locked(ctx, machine_id, desired)
            .await?;

        self.get_machine(machine_id).await
    }
}

/// Issue a DELETE and confirm the resource disappears.
///
/// 404 on the DELETE itself is success with no polling. Otherwise `fetch` is
/// polled until it answers 404; still present after every attempt is
/// [`PaperspaceError::NotDeleted`].
pub(crate) async fn delete_and_confirm<D, F, Fut, T>(
    ctx: &CallContext,
    kind: &'static str,
    id: &str,
    settings: PollSettings,
    delete: D,
    fetch: F,
) -> Result<()>
where
    D: Future<Output = Result<()>>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match delete.await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            info!(kind, id, "Not found, assuming already deleted");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let subject = format!("{} {} to be deleted", kind, id);
    if wait_for_absence(ctx, settings, &subject, fetch).await? {
        info!(kind, id, "Deleted");
        Ok(())
    } else {
        Err(PaperspaceError::NotDeleted {
            kind,
            id: id.to_string(),
            waited: settings.timeout,
        })
    }
}
