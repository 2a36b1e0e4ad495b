use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PaperspaceError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AvailableMachineType {
    pub machine_type_label: String,
    pub is_available: bool,
}

/// A machine image that new machines can be created from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default)]
    pub operating_system_label: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub default_size_gb: i64,
    #[serde(default)]
    pub available_machine_types: Vec<AvailableMachineType>,
    #[serde(default)]
    pub parent_machine_id: Option<String>,
    /// `None` when missing or not RFC 3339; such templates sort first.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub dt_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dt_deleted: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        DateTime::parse_from_rfc3339(&value)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }))
}

/// Orderings supported when listing custom templates. All ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSortKey {
    Created,
    Name,
}

impl FromStr for TemplateSortKey {
    type Err = PaperspaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dtCreated" | "dt_created" | "created" => Ok(TemplateSortKey::Created),
            "name" => Ok(TemplateSortKey::Name),
            other => Err(PaperspaceError::UnsupportedSortKey(other.to_string())),
        }
    }
}
