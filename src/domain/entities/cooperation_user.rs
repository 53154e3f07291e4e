use serde::{Deserialize, Serialize};

use super::offline::{IndexValue, SyncMeta};
use super::record::{sync_accessors, OfflineRecord};
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CooperationUser {
    #[serde(default)]
    pub id: String,
    pub cooperation_id: String,
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(skip)]
    pub sync: SyncMeta,
}

impl CooperationUser {
    pub fn new(
        cooperation_id: impl Into<String>,
        user_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            cooperation_id: cooperation_id.into(),
            user_id: user_id.into(),
            email: None,
            role: role.into(),
            sync: SyncMeta::default(),
        }
    }
}

impl OfflineRecord for CooperationUser {
    const KIND: EntityKind = EntityKind::CooperationUser;

    sync_accessors!();

    fn index_values(&self) -> Vec<(&'static str, IndexValue)> {
        vec![("cooperation_id", IndexValue::text(&self.cooperation_id))]
    }
}
