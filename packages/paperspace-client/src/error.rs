//! Typed errors for the Paperspace client.
//!
//! Every variant carries enough context (resource ID, operation kind,
//! underlying message) to be shown to an operator as-is.

use std::time::Duration;

use thiserror::Error;

/// Result type for Paperspace client operations.
pub type Result<T> = std::result::Result<T, PaperspaceError>;

/// Paperspace client errors.
#[derive(Debug, Error)]
pub enum PaperspaceError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection or IO failure while talking to the API
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("status: {status}, body: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The session endpoint answered without a user
    #[error("unable to get auth session, possibly invalid token")]
    Auth,

    /// Cursor iteration cannot make progress (missing or repeated cursor)
    #[error("pagination error on {path}: {reason}")]
    Pagination { path: String, reason: &'static str },

    /// Machine event finished with an explicit error message
    #[error("error during event {event_id} ({name}) processing: {message}")]
    OperationFailed {
        event_id: String,
        name: String,
        message: String,
    },

    /// Machine event reported `state: error` with neither a message nor a
    /// completion timestamp. Whether this is a real failure is not known.
    #[error("unknown error during event {event_id} ({name}) processing: state is 'error' without message or completion time")]
    OperationAmbiguous { event_id: String, name: String },

    /// Polling deadline elapsed before the wait converged
    #[error("timeout reached after {}s while waiting for {subject}", bound.as_secs_f64())]
    Timeout { subject: String, bound: Duration },

    /// Resource was still fetchable after the post-delete existence checks
    #[error("{kind} {id} was not deleted after {} seconds", waited.as_secs_f64())]
    NotDeleted {
        kind: &'static str,
        id: String,
        waited: Duration,
    },

    /// The call's context was cancelled while waiting
    #[error("cancelled while waiting for {subject}")]
    Cancelled { subject: String },

    /// Requested state is not a valid transition target
    #[error("invalid target state: {0}")]
    InvalidTargetState(String),

    /// Machine is in a state that does not allow the requested operation
    #[error("could not {operation} machine {machine_id}, it must be 'off' or 'ready', but it is '{state}'")]
    InvalidState {
        operation: &'static str,
        machine_id: String,
        state: String,
    },

    /// Listing was asked to sort by a key it does not support
    #[error("unsupported sort key: {0}")]
    UnsupportedSortKey(String),

    /// Request body could not be serialized
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl PaperspaceError {
    /// True for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PaperspaceError::Status { status: 404, .. })
    }

    /// True when the error ends a wait without a server-side verdict.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PaperspaceError::Timeout { .. } | PaperspaceError::NotDeleted { .. }
        )
    }
}

impl From<reqwest::Error> for PaperspaceError {
    fn from(err: reqwest::Error) -> Self {
        PaperspaceError::Transport(err.to_string())
    }
}
