use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(default)]
    pub id: String,
    pub dimension_id: String,
    pub organization_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Lower sorts first.
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub level_type: Option<String>,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl Recommendation {
    pub fn new(
        dimension_id: impl Into<String>,
        organization_id: impl Into<String>,
        title: impl Into<String>,
        priority: i64,
    ) -> Self {
        Self {
            id: String::new(),
            dimension_id: dimension_id.into(),
            organization_id: organization_id.into(),
            title: title.into(),
            description: None,
            priority,
            level_type: None,
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for Recommendation {
    const KIND: EntityKind = EntityKind::Recommendation;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![
            ("dimension_id", IndexValue::text(&self.dimension_id)),
            ("organization_id", IndexValue::text(&self.organization_id)),
            ("priority", IndexValue::Integer(self.priority)),
        ]
    }
}
