use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateNetwork {
    pub id: String,
    pub name: String,
    pub region: String,
    pub network: String,
    pub netmask: String,
    pub dt_created: Option<String>,
    pub dt_deleted: Option<String>,
}
