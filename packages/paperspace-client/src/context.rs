//! Per-call context: cancellation and an optional absolute deadline.
//!
//! Passed explicitly into every lifecycle operation. Nothing here is stored
//! on the client.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{PaperspaceError, Result};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned token (e.g. one cancelled on Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Give the whole call at most `budget`, measured from now. A budget too
    /// large to represent as an instant means no deadline.
    pub fn with_timeout(mut self, budget: Duration) -> Self {
        self.deadline = Instant::now()
            .checked_add(budget)
            .map(|at| Deadline { at, budget });
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(Deadline {
            at: deadline,
            budget: deadline.saturating_duration_since(Instant::now()),
        });
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the call was cancelled or ran past its deadline.
    pub fn check(&self, subject: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PaperspaceError::Cancelled {
                subject: subject.to_string(),
            });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline.at {
                return Err(PaperspaceError::Timeout {
                    subject: subject.to_string(),
                    bound: deadline.budget,
                });
            }
        }
        Ok(())
    }

    /// Sleep for `interval`, waking early on cancellation or deadline.
    pub async fn sleep(&self, interval: Duration, subject: &str) -> Result<()> {
        let wake = Instant::now() + interval;
        let (capped, budget) = match self.deadline {
            Some(deadline) if deadline.at < wake => (deadline.at, deadline.budget),
            _ => (wake, interval),
        };

        tokio::select! {
            _ = tokio::time::sleep_until(capped) => {}
            _ = self.cancel.cancelled() => {
                return Err(PaperspaceError::Cancelled {
                    subject: subject.to_string(),
                });
            }
        }

        if capped < wake {
            return Err(PaperspaceError::Timeout {
                subject: subject.to_string(),
                bound: budget,
            });
        }
        Ok(())
    }
}
