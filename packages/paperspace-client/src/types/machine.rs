use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PaperspaceError;

pub const MACHINE_STATE_READY: &str = "ready";
pub const MACHINE_STATE_OFF: &str = "off";

const BYTES_PER_GIB: u64 = 1 << 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Accelerator {
    pub name: String,
    pub memory: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub name: String,
    pub dt_started: Option<DateTime<Utc>>,
    pub dt_finished: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// A compute instance as reported by `GET /machines/{id}`.
///
/// Never cached: every read is a fresh fetch, and `state` only changes as a
/// side effect of a server-side operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub state: String,
    pub os: String,
    pub machine_type: String,
    pub agent_type: String,
    pub cpus: i64,
    pub ram: String,
    pub storage_total: String,
    pub storage_used: String,
    pub accelerators: Vec<Accelerator>,
    pub region: String,
    pub private_ip: Option<String>,
    pub network_id: Option<String>,
    pub public_ip: Option<String>,
    pub public_ip_type: Option<String>,
    pub auto_shutdown_enabled: bool,
    pub auto_shutdown_timeout: Option<i64>,
    pub auto_shutdown_force: bool,
    pub auto_snapshot_enabled: bool,
    pub auto_snapshot_frequency: Option<String>,
    pub auto_snapshot_save_count: Option<i64>,
    pub updates_pending: bool,
    pub restore_point_enabled: bool,
    pub restore_point_frequency: Option<String>,
    pub restore_point_snapshot_id: Option<String>,
    pub usage_rate: f64,
    pub storage_rate: f64,
    pub dt_created: Option<DateTime<Utc>>,
    pub dt_modified: Option<DateTime<Utc>>,
    pub dt_deleted: Option<DateTime<Utc>>,
    pub reservation: Option<Reservation>,
}

impl Machine {
    pub fn is_in(&self, target: TargetState) -> bool {
        self.state == target.as_str()
    }

    /// Updates are only accepted while the machine is at rest.
    pub fn is_at_rest(&self) -> bool {
        self.state == MACHINE_STATE_OFF || self.state == MACHINE_STATE_READY
    }

    /// Disk size in GB (GiB) as configured at create/update time.
    /// `storageTotal` is reported in bytes.
    pub fn disk_size_gb(&self) -> Option<i64> {
        let bytes: u64 = self.storage_total.trim().parse().ok()?;
        let rounded = bytes / BYTES_PER_GIB + u64::from(bytes % BYTES_PER_GIB >= BYTES_PER_GIB / 2);
        i64::try_from(rounded).ok()
    }
}

/// Lifecycle states a machine can be driven to with an action call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    Ready,
    Off,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetState::Ready => MACHINE_STATE_READY,
            TargetState::Off => MACHINE_STATE_OFF,
        }
    }

    /// Path segment of the `PATCH /machines/{id}/{action}` call.
    pub fn action(&self) -> &'static str {
        match self {
            TargetState::Ready => "start",
            TargetState::Off => "stop",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetState {
    type Err = PaperspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            MACHINE_STATE_READY => Ok(TargetState::Ready),
            MACHINE_STATE_OFF => Ok(TargetState::Off),
            other => Err(PaperspaceError::InvalidTargetState(other.to_string())),
        }
    }
}

/// Body of `POST /machines`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineCreateConfig {
    pub name: String,
    pub machine_type: String,
    pub template_id: String,
    pub disk_size: i64,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_type: Option<String>,
    pub start_on_create: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_save_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_force: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_nvlink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_initial_snapshot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startup_script_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_password: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub accessor_ids: Vec<String>,
}

/// Body of `PUT /machines/{id}`. Unset fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineUpdateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_ip_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snapshot_save_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_shutdown_force: Option<bool>,
}

impl MachineUpdateConfig {
    /// True when the update resizes the machine, which requires it to be off.
    ///
    /// An unreadable `storageTotal` counts as a size change.
    pub fn requires_stop(&self, current: &Machine) -> bool {
        let type_changes = self
            .machine_type
            .as_deref()
            .is_some_and(|t| t != current.machine_type);
        let disk_changes = self
            .disk_size
            .is_some_and(|size| current.disk_size_gb() != Some(size));
        type_changes || disk_changes
    }
}
