use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

/// A digitalisation dimension assigned to an organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dimension {
    #[serde(default)]
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl Dimension {
    pub fn new(organization_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            organization_id: organization_id.into(),
            name: name.into(),
            description: None,
            sort_order: 0,
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for Dimension {
    const KIND: EntityKind = EntityKind::Dimension;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![("organization_id", IndexValue::text(&self.organization_id))]
    }
}
