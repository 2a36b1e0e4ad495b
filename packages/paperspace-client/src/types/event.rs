use serde::{Deserialize, Serialize};

use super::machine::Machine;

/// Server-side record of one in-flight mutation against a machine.
///
/// `state` is an open set: at least `pending`, `running`, `done` and `error`
/// have been observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MachineEvent {
    pub id: String,
    pub name: String,
    pub state: String,
    pub machine_id: String,
    pub dt_created: Option<String>,
    pub dt_started: Option<String>,
    pub dt_finished: Option<String>,
    pub error: Option<String>,
}

impl MachineEvent {
    /// Explicit error message, ignoring empty strings.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    pub fn is_finished(&self) -> bool {
        self.dt_finished.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Envelope returned by machine create/update: the event tracking the
/// mutation plus a provisional machine stub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineEventResponse {
    pub event: MachineEvent,
    #[serde(default)]
    pub data: Machine,
}
