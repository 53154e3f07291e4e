use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigitalisationGap {
    #[serde(default)]
    pub id: String,
    pub dimension_id: String,
    pub assessment_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl DigitalisationGap {
    pub fn new(
        dimension_id: impl Into<String>,
        assessment_id: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            dimension_id: dimension_id.into(),
            assessment_id: assessment_id.into(),
            description: description.into(),
            severity: severity.into(),
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for DigitalisationGap {
    const KIND: EntityKind = EntityKind::DigitalisationGap;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![
            ("dimension_id", IndexValue::text(&self.dimension_id)),
            ("assessment_id", IndexValue::text(&self.assessment_id)),
        ]
    }
}
