use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

pub const ASSESSMENT_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    #[serde(default)]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl Assessment {
    pub fn new(organization_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            organization_id: organization_id.into(),
            name: name.into(),
            description: None,
            status: "draft".to_string(),
            started_at: None,
            completed_at: None,
            sync: SyncMeta::default(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ASSESSMENT_COMPLETED
    }
}

impl OfflineRecord for Assessment {
    const KIND: EntityKind = EntityKind::Assessment;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![("organization_id", IndexValue::text(&self.organization_id))]
    }
}
