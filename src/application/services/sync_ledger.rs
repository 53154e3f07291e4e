use std::sync::Arc;
use tracing::{info, warn};

use super::entity_locks::{EntityGuard, EntityLocks};
use crate::application::ports::{ChangeNotifier, LocalStore};
use crate::domain::entities::{EntityChange, StoredRecord};
use crate::domain::value_objects::{EntityId, EntityKind, SyncEvent, SyncQueueId, SyncState};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;

/// Applies sync outcomes to stored records regardless of their concrete type. Every
/// read-modify-write runs under the record's lock, shared with the repositories.
#[derive(Clone)]
pub struct SyncLedger {
    store: Arc<dyn LocalStore>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
    locks: EntityLocks,
}

impl SyncLedger {
    pub fn new(
        store: Arc<dyn LocalStore>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            locks: EntityLocks::new(),
        }
    }

    /// Lock for a local write to the record `id` currently refers to.
    pub async fn lock_current(&self, kind: EntityKind, id: &EntityId) -> EntityGuard {
        self.locks.lock_current(kind, id).await
    }

    async fn has_other_items(
        &self,
        kind: EntityKind,
        id: &EntityId,
        completed: Option<SyncQueueId>,
    ) -> Result<bool, AppError> {
        Ok(self
            .store
            .items_for(kind, id)
            .await?
            .iter()
            .any(|item| Some(item.id) != completed))
    }

    /// Bookkeeping after one queue item went through. A record with further queued
    /// mutations stays pending; a tombstone stays a tombstone until its DELETE lands.
    fn settle(&self, record: &mut StoredRecord, more_pending: bool) -> Result<(), AppError> {
        let now = self.clock.now();
        if matches!(
            record.meta.state,
            SyncState::TombstonePending | SyncState::FailedTombstone { .. }
        ) {
            record.meta.ever_synced = true;
            record.meta.retries = 0;
            record.meta.last_error = None;
            return Ok(());
        }
        record.meta.apply(SyncEvent::PushSucceeded, now)?;
        if more_pending {
            record.meta.apply(SyncEvent::LocalEdit, now)?;
        }
        Ok(())
    }

    /// CREATE acknowledged: moves the record to the server id, re-points its queued
    /// items and removes `completed`, all in one transaction.
    pub async fn mark_as_synced(
        &self,
        kind: EntityKind,
        local_id: &EntityId,
        server_id: &EntityId,
        completed: Option<SyncQueueId>,
    ) -> Result<Option<StoredRecord>, AppError> {
        let _guard = self.locks.lock(kind, local_id).await;
        let Some(record) = self.store.get(kind, local_id).await? else {
            warn!(
                entity_type = %kind,
                entity_id = %local_id,
                "acknowledged record no longer exists locally"
            );
            if let Some(item) = completed {
                self.store.remove_item(item).await?;
            }
            return Ok(None);
        };

        let more_pending = self.has_other_items(kind, local_id, completed).await?;
        let mut record = record.rekeyed(server_id.clone());
        self.settle(&mut record, more_pending)?;
        self.store.rekey(kind, local_id, &record, completed).await?;
        self.locks.record_rekey(kind, local_id, server_id).await;

        if local_id != server_id {
            info!(
                entity_type = %kind,
                local_id = %local_id,
                server_id = %server_id,
                "record rekeyed to server id"
            );
        }
        self.notifier
            .publish(EntityChange::rekeyed(kind, local_id.as_str(), &record));
        Ok(Some(record))
    }

    /// UPDATE acknowledged.
    pub async fn confirm_update(
        &self,
        kind: EntityKind,
        id: &EntityId,
        completed: SyncQueueId,
    ) -> Result<Option<StoredRecord>, AppError> {
        let _guard = self.locks.lock(kind, id).await;
        let Some(mut record) = self.store.get(kind, id).await? else {
            self.store.remove_item(completed).await?;
            return Ok(None);
        };
        let more_pending = self.has_other_items(kind, id, Some(completed)).await?;
        self.settle(&mut record, more_pending)?;
        self.store.rekey(kind, id, &record, Some(completed)).await?;
        self.notifier.publish(EntityChange::upserted(kind, &record));
        Ok(Some(record))
    }

    /// DELETE acknowledged (or the server never had the record): purge locally.
    pub async fn confirm_delete(
        &self,
        kind: EntityKind,
        id: &EntityId,
        completed: SyncQueueId,
    ) -> Result<(), AppError> {
        let _guard = self.locks.lock(kind, id).await;
        if self.store.purge(kind, id, Some(completed)).await? {
            info!(entity_type = %kind, entity_id = %id, "record purged after remote delete");
        }
        self.notifier.publish(EntityChange::removed(kind, id.as_str()));
        Ok(())
    }

    /// Transient failure: the state is kept, the retry bookkeeping is recorded.
    pub async fn note_retry(
        &self,
        kind: EntityKind,
        id: &EntityId,
        retries: u32,
        error: &str,
    ) -> Result<Option<StoredRecord>, AppError> {
        let _guard = self.locks.lock(kind, id).await;
        let Some(mut record) = self.store.get(kind, id).await? else {
            return Ok(None);
        };
        record.meta.note_failure(retries, error);
        self.store.put(kind, &record).await?;
        self.notifier.publish(EntityChange::upserted(kind, &record));
        Ok(Some(record))
    }

    pub async fn mark_as_failed(
        &self,
        kind: EntityKind,
        id: &EntityId,
        error: &str,
        retries: Option<u32>,
    ) -> Result<Option<StoredRecord>, AppError> {
        let _guard = self.locks.lock(kind, id).await;
        let Some(mut record) = self.store.get(kind, id).await? else {
            warn!(entity_type = %kind, entity_id = %id, "cannot mark missing record as failed");
            return Ok(None);
        };
        let retries = retries.unwrap_or(record.meta.retries);
        record.meta.apply(
            SyncEvent::PushExhausted {
                reason: error.to_string(),
                retries,
            },
            self.clock.now(),
        )?;
        self.store.put(kind, &record).await?;
        warn!(
            entity_type = %kind,
            entity_id = %id,
            retries,
            error,
            "record marked as failed"
        );
        self.notifier.publish(EntityChange::upserted(kind, &record));
        Ok(Some(record))
    }
}
