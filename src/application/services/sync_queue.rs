use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use crate::application::ports::LocalStore;
use crate::domain::entities::{NewSyncQueueItem, StoredRecord, SyncQueueItem};
use crate::domain::value_objects::{EntityId, EntityKind, OfflinePayload, SyncAction, SyncQueueId};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;

/// Post-mutation wake-up for the sync loop. Firing while nobody waits leaves a permit, so
/// a mutation made during a sync run still triggers the next one.
#[derive(Clone, Default)]
pub struct SyncTrigger {
    notify: Arc<Notify>,
}

impl SyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.notify.notify_one();
    }

    pub async fn fired(&self) {
        self.notify.notified().await;
    }
}

/// Ordered, durable log of intended remote effects.
#[derive(Clone)]
pub struct SyncQueue {
    store: Arc<dyn LocalStore>,
    trigger: SyncTrigger,
    clock: Arc<dyn Clock>,
}

impl SyncQueue {
    pub fn new(store: Arc<dyn LocalStore>, trigger: SyncTrigger, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            trigger,
            clock,
        }
    }

    pub fn trigger(&self) -> &SyncTrigger {
        &self.trigger
    }

    pub async fn enqueue(
        &self,
        entity_type: EntityKind,
        entity_id: &EntityId,
        action: SyncAction,
        payload: OfflinePayload,
    ) -> Result<SyncQueueItem, AppError> {
        let item = self
            .store
            .enqueue(NewSyncQueueItem::new(
                entity_type,
                entity_id.clone(),
                action,
                payload,
                self.clock.now(),
            ))
            .await?;
        debug!(
            entity_type = %entity_type,
            entity_id = %entity_id,
            action = %action,
            queue_id = %item.id,
            "enqueued sync item"
        );
        self.trigger.fire();
        Ok(item)
    }

    /// Writes `record` and enqueues its remote effect in the same local transaction.
    pub async fn record_mutation(
        &self,
        entity_type: EntityKind,
        record: &StoredRecord,
        action: SyncAction,
        payload: OfflinePayload,
    ) -> Result<SyncQueueItem, AppError> {
        let item = self
            .store
            .put_and_enqueue(
                entity_type,
                record,
                NewSyncQueueItem::new(
                    entity_type,
                    record.id.clone(),
                    action,
                    payload,
                    self.clock.now(),
                ),
            )
            .await?;
        debug!(
            entity_type = %entity_type,
            entity_id = %record.id,
            action = %action,
            queue_id = %item.id,
            "recorded local mutation"
        );
        self.trigger.fire();
        Ok(item)
    }

    pub async fn pending(&self, limit: u32) -> Result<Vec<SyncQueueItem>, AppError> {
        self.store.pending_items(limit).await
    }

    pub async fn item(&self, id: SyncQueueId) -> Result<Option<SyncQueueItem>, AppError> {
        self.store.queue_item(id).await
    }

    pub async fn items_for(
        &self,
        entity_type: EntityKind,
        entity_id: &EntityId,
    ) -> Result<Vec<SyncQueueItem>, AppError> {
        self.store.items_for(entity_type, entity_id).await
    }

    pub async fn has_pending_create(
        &self,
        entity_type: EntityKind,
        entity_id: &EntityId,
    ) -> Result<bool, AppError> {
        Ok(self
            .items_for(entity_type, entity_id)
            .await?
            .iter()
            .any(|item| item.action == SyncAction::Create))
    }

    /// Re-activates parked items of one entity and wakes the sync loop.
    pub async fn reactivate(
        &self,
        entity_type: EntityKind,
        entity_id: &EntityId,
    ) -> Result<u64, AppError> {
        let unparked = self.store.unpark_items_for(entity_type, entity_id).await?;
        if unparked > 0 {
            self.trigger.fire();
        }
        Ok(unparked)
    }

    pub async fn len(&self) -> Result<u64, AppError> {
        self.store.queue_len().await
    }

    pub async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len().await? == 0)
    }
}
