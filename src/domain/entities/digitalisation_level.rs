use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

/// Level reached (or targeted) on a dimension. `level_type` is e.g. `current`/`target`,
/// `state` e.g. `draft`/`final`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigitalisationLevel {
    #[serde(default)]
    pub id: String,
    pub dimension_id: String,
    #[serde(default)]
    pub assessment_id: Option<String>,
    pub level_type: String,
    pub state: String,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl DigitalisationLevel {
    pub fn new(
        dimension_id: impl Into<String>,
        level_type: impl Into<String>,
        state: impl Into<String>,
        value: i32,
    ) -> Self {
        Self {
            id: String::new(),
            dimension_id: dimension_id.into(),
            assessment_id: None,
            level_type: level_type.into(),
            state: state.into(),
            value,
            comment: None,
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for DigitalisationLevel {
    const KIND: EntityKind = EntityKind::DigitalisationLevel;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![
            ("dimension_id", IndexValue::text(&self.dimension_id)),
            (
                "assessment_id",
                IndexValue::optional_text(self.assessment_id.as_deref()),
            ),
            ("level_type", IndexValue::text(&self.level_type)),
            ("state", IndexValue::text(&self.state)),
        ]
    }
}
