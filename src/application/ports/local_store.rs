use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::entities::{NewSyncQueueItem, StoredRecord, SyncQueueItem};
use crate::domain::value_objects::{EntityId, EntityKind, SyncQueueId, SyncStatus};
use crate::shared::error::AppError;

/// Row selection for [`LocalStore::query`] and reconciliation scopes.
///
/// Columns must be `id` or one of the kind's index columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub equals: Vec<(String, String)>,
    pub statuses: Option<Vec<SyncStatus>>,
    pub exclude_deleted: bool,
    pub order_by: Option<String>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((column.into(), value.into()));
        self
    }

    pub fn with_statuses(mut self, statuses: &[SyncStatus]) -> Self {
        self.statuses = Some(statuses.to_vec());
        self
    }

    /// Hides soft-deleted records.
    pub fn visible_only(mut self) -> Self {
        self.exclude_deleted = true;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }
}

/// What one reconciliation pass did to the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub upserted: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Remote records left alone because the push path owns them locally.
    pub skipped: Vec<EntityId>,
}

impl ReconcileOutcome {
    pub fn merge(&mut self, other: ReconcileOutcome) {
        self.upserted.extend(other.upserted);
        self.removed.extend(other.removed);
        self.skipped.extend(other.skipped);
    }
}

/// Durable keyed storage for entity records and the sync queue. Every method that touches
/// more than one row commits atomically.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<StoredRecord>, AppError>;
    async fn put(&self, kind: EntityKind, record: &StoredRecord) -> Result<(), AppError>;
    async fn delete(&self, kind: EntityKind, id: &EntityId) -> Result<bool, AppError>;
    async fn bulk_put(&self, kind: EntityKind, records: &[StoredRecord]) -> Result<(), AppError>;
    async fn bulk_delete(&self, kind: EntityKind, ids: &[EntityId]) -> Result<u64, AppError>;
    async fn query(
        &self,
        kind: EntityKind,
        filter: &RecordFilter,
    ) -> Result<Vec<StoredRecord>, AppError>;

    /// Writes the record and appends its queue item in one transaction. Parked items of
    /// the same entity are re-activated since a fresh mutation restarts its sync.
    async fn put_and_enqueue(
        &self,
        kind: EntityKind,
        record: &StoredRecord,
        item: NewSyncQueueItem,
    ) -> Result<SyncQueueItem, AppError>;

    /// Replaces the row stored under `old_id` by `record` and re-points queued items,
    /// removing `completed` (the acknowledged CREATE) in the same transaction.
    async fn rekey(
        &self,
        kind: EntityKind,
        old_id: &EntityId,
        record: &StoredRecord,
        completed: Option<SyncQueueId>,
    ) -> Result<(), AppError>;

    /// Hard-deletes a record whose remote delete was confirmed, removing `completed`.
    async fn purge(
        &self,
        kind: EntityKind,
        id: &EntityId,
        completed: Option<SyncQueueId>,
    ) -> Result<bool, AppError>;

    /// Reconciles `remote` against local state in one transaction.
    ///
    /// With a scope, SYNCED rows in it whose id is absent from `remote_ids` are deleted.
    /// Remote records are upserted as SYNCED unless the id is locally owned by the push
    /// path (any status other than SYNCED).
    async fn apply_remote(
        &self,
        kind: EntityKind,
        scope: Option<&RecordFilter>,
        remote: &[StoredRecord],
        remote_ids: &HashSet<EntityId>,
    ) -> Result<ReconcileOutcome, AppError>;

    /// Hard delete of a never-synced record together with all its queue items.
    async fn discard_unsynced(&self, kind: EntityKind, id: &EntityId) -> Result<bool, AppError>;

    async fn enqueue(&self, item: NewSyncQueueItem) -> Result<SyncQueueItem, AppError>;
    async fn queue_item(&self, id: SyncQueueId) -> Result<Option<SyncQueueItem>, AppError>;

    /// Oldest-first active items. Items queued behind a parked item of the same entity
    /// are withheld.
    async fn pending_items(&self, limit: u32) -> Result<Vec<SyncQueueItem>, AppError>;

    /// All items of one entity (parked included), oldest first.
    async fn items_for(
        &self,
        kind: EntityKind,
        id: &EntityId,
    ) -> Result<Vec<SyncQueueItem>, AppError>;

    async fn remove_item(&self, id: SyncQueueId) -> Result<(), AppError>;
    async fn remove_items_for(&self, kind: EntityKind, id: &EntityId) -> Result<u64, AppError>;

    /// Increments the item's retry counter in place and returns the new value.
    async fn record_item_failure(&self, id: SyncQueueId, error: &str) -> Result<u32, AppError>;
    async fn park_item(&self, id: SyncQueueId) -> Result<(), AppError>;
    async fn unpark_items_for(&self, kind: EntityKind, id: &EntityId) -> Result<u64, AppError>;
    async fn retarget_items(
        &self,
        kind: EntityKind,
        old_id: &EntityId,
        new_id: &EntityId,
    ) -> Result<u64, AppError>;
    async fn queue_len(&self) -> Result<u64, AppError>;
}
