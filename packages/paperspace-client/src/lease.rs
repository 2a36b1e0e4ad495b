//! Per-resource leases.
//!
//! Two lifecycle calls against the same resource ID must never overlap.
//! Every such call holds a [`ResourceLease`] for its whole duration; calls
//! against different IDs do not contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::context::CallContext;
use crate::error::{PaperspaceError, Result};

#[derive(Clone, Default)]
pub struct ResourceLocks {
    entries: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, resource_id: &str) -> Arc<Mutex<()>> {
        // Clone out of the map so no shard lock is held across an await.
        self.entries
            .entry(resource_id.to_string())
            .or_default()
            .clone()
    }

    /// Wait for exclusive access to `resource_id`, or until the call is
    /// cancelled.
    pub async fn acquire(&self, ctx: &CallContext, resource_id: &str) -> Result<ResourceLease> {
        let slot = self.slot(resource_id);

        let guard = match slot.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(resource_id, "Waiting for in-flight operation on resource");
                tokio::select! {
                    guard = slot.lock_owned() => guard,
                    _ = ctx.cancellation_token().cancelled() => {
                        return Err(PaperspaceError::Cancelled {
                            subject: format!("lease on {}", resource_id),
                        });
                    }
                }
            }
        };

        Ok(ResourceLease {
            resource_id: resource_id.to_string(),
            guard: Some(guard),
            entries: self.entries.clone(),
        })
    }

    /// Take the lease only if nobody holds it.
    pub fn try_acquire(&self, resource_id: &str) -> Option<ResourceLease> {
        let guard = self.slot(resource_id).try_lock_owned().ok()?;
        Some(ResourceLease {
            resource_id: resource_id.to_string(),
            guard: Some(guard),
            entries: self.entries.clone(),
        })
    }

    pub fn is_held(&self, resource_id: &str) -> bool {
        self.entries
            .get(resource_id)
            .is_some_and(|slot| slot.try_lock().is_err())
    }

    /// Number of resource IDs with a live slot.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

/// Exclusive access to one resource ID. Released on drop.
pub struct ResourceLease {
    resource_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    entries: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ResourceLease {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still references the slot: nobody is waiting on it.
        self.entries
            .remove_if(&self.resource_id, |_, slot| Arc::strong_count(slot) == 1);
    }
}
