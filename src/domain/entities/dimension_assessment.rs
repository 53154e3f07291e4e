use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

/// Per-dimension result of an assessment, keyed by `(dimension_id, assessment_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DimensionAssessment {
    #[serde(default)]
    pub id: String,
    pub dimension_id: String,
    pub assessment_id: String,
    #[serde(default)]
    pub current_level: Option<i32>,
    #[serde(default)]
    pub target_level: Option<i32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl DimensionAssessment {
    pub fn new(dimension_id: impl Into<String>, assessment_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            dimension_id: dimension_id.into(),
            assessment_id: assessment_id.into(),
            current_level: None,
            target_level: None,
            comment: None,
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for DimensionAssessment {
    const KIND: EntityKind = EntityKind::DimensionAssessment;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![
            ("dimension_id", IndexValue::text(&self.dimension_id)),
            ("assessment_id", IndexValue::text(&self.assessment_id)),
        ]
    }
}
