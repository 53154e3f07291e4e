use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cooperation {
    #[serde(default)]
    pub id: String,
    pub organization_id: String,
    pub partner_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl Cooperation {
    pub fn new(organization_id: impl Into<String>, partner_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            organization_id: organization_id.into(),
            partner_name: partner_name.into(),
            description: None,
            status: "active".to_string(),
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for Cooperation {
    const KIND: EntityKind = EntityKind::Cooperation;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![("organization_id", IndexValue::text(&self.organization_id))]
    }
}
