use serde::Serialize;
use serde_json::Value;

use super::StoredRecord;
use crate::domain::value_objects::{EntityKind, SyncStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Upserted,
    Removed,
}

/// Broadcast after every local mutation, rekey, pull upsert and purge so views can refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange {
    pub kind: EntityKind,
    pub entity_id: String,
    /// Set when a CREATE acknowledgement replaced the local id.
    pub previous_id: Option<String>,
    pub change: ChangeKind,
    pub status: Option<SyncStatus>,
    pub snapshot: Option<Value>,
}

impl EntityChange {
    pub fn upserted(kind: EntityKind, record: &StoredRecord) -> Self {
        Self {
            kind,
            entity_id: record.id.to_string(),
            previous_id: None,
            change: ChangeKind::Upserted,
            status: Some(record.status()),
            snapshot: Some(record.document.clone()),
        }
    }

    pub fn rekeyed(kind: EntityKind, previous_id: &str, record: &StoredRecord) -> Self {
        let mut change = Self::upserted(kind, record);
        if previous_id != record.id.as_str() {
            change.previous_id = Some(previous_id.to_string());
        }
        change
    }

    pub fn removed(kind: EntityKind, entity_id: &str) -> Self {
        Self {
            kind,
            entity_id: entity_id.to_string(),
            previous_id: None,
            change: ChangeKind::Removed,
            status: None,
            snapshot: None,
        }
    }
}
