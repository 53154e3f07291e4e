use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, EntityKind, OfflinePayload, SyncAction, SyncQueueId};

/// Durable intent to perform one remote effect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueItem {
    pub id: SyncQueueId,
    pub entity_type: EntityKind,
    pub entity_id: EntityId,
    pub action: SyncAction,
    pub payload: OfflinePayload,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub last_error: Option<String>,
    /// Exhausted its retries and waits for an explicit retry.
    pub parked: bool,
}

impl SyncQueueItem {
    pub fn entity_key(&self) -> (EntityKind, EntityId) {
        (self.entity_type, self.entity_id.clone())
    }
}

/// Queue item before the store has assigned its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncQueueItem {
    pub entity_type: EntityKind,
    pub entity_id: EntityId,
    pub action: SyncAction,
    pub payload: OfflinePayload,
    pub timestamp: DateTime<Utc>,
}

impl NewSyncQueueItem {
    pub fn new(
        entity_type: EntityKind,
        entity_id: EntityId,
        action: SyncAction,
        payload: OfflinePayload,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            action,
            payload,
            timestamp,
        }
    }
}
