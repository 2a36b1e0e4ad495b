use serde::{Deserialize, Serialize};

/// Body of `POST /startup-scripts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupScriptCreateConfig {
    pub name: String,
    pub script: String,
    pub is_run_once: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartupScript {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    /// Runs once instead of on every boot
    pub is_run_once: bool,
    pub assigned_machine_ids: Vec<String>,
    pub dt_created: Option<String>,
    pub dt_deleted: Option<String>,
}
