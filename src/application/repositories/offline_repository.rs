use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::ports::{
    ChangeNotifier, CollectionScope, Connectivity, LocalStore, RecordFilter,
};
use crate::application::services::{Reconciler, SyncLedger, SyncQueue};
use crate::domain::entities::{
    from_stored, to_stored, EntityChange, OfflineRecord, StoredRecord, SyncMeta,
};
use crate::domain::value_objects::{
    EntityId, EntityKind, OfflinePayload, SyncAction, SyncEvent,
};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;

/// Everything a repository needs; shared by all entity kinds.
#[derive(Clone)]
pub struct RepositoryContext {
    pub store: Arc<dyn LocalStore>,
    pub queue: SyncQueue,
    pub ledger: SyncLedger,
    pub reconciler: Arc<Reconciler>,
    pub connectivity: Arc<dyn Connectivity>,
    pub notifier: Arc<dyn ChangeNotifier>,
    pub clock: Arc<dyn Clock>,
}

/// Offline-first CRUD for one entity kind. Writes land locally and are queued for push;
/// reads refresh from the server when online and fall back to local data otherwise.
pub struct OfflineRepository<E: OfflineRecord> {
    ctx: RepositoryContext,
    _entity: PhantomData<fn() -> E>,
}

impl<E: OfflineRecord> Clone for OfflineRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.ctx.clone())
    }
}

fn parse_id(id: &str) -> Result<EntityId, AppError> {
    EntityId::new(id).map_err(AppError::ValidationError)
}

fn payload_of(record: &StoredRecord) -> Result<OfflinePayload, AppError> {
    OfflinePayload::new(record.document.clone()).map_err(AppError::Serialization)
}

/// JSON merge of `patch` into `target`. Nested objects merge recursively; `id` is never
/// taken from the patch.
fn merge_changes(target: &mut Map<String, Value>, patch: Map<String, Value>, top_level: bool) {
    for (key, value) in patch {
        if top_level && key == "id" {
            continue;
        }
        let value = match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_changes(existing, nested, false);
                continue;
            }
            (_, value) => value,
        };
        target.insert(key, value);
    }
}

impl<E: OfflineRecord> OfflineRepository<E> {
    pub fn new(ctx: RepositoryContext) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    /// Stores a new record locally and queues its CREATE. Never waits on the network.
    pub async fn add(&self, mut draft: E) -> Result<E, AppError> {
        let kind = E::KIND;
        if draft.id().trim().is_empty() {
            draft.set_id(EntityId::generate().into());
        }
        let id = parse_id(draft.id())?;
        let _guard = self.ctx.ledger.lock_current(kind, &id).await;
        if self.ctx.store.get(kind, &id).await?.is_some() {
            return Err(AppError::ValidationError(format!(
                "{kind} {id} already exists"
            )));
        }

        *draft.sync_meta_mut() = SyncMeta::new_local(self.ctx.clock.now());
        let record = to_stored(&draft)?;
        self.ctx
            .queue
            .record_mutation(kind, &record, SyncAction::Create, payload_of(&record)?)
            .await?;
        self.ctx.notifier.publish(EntityChange::upserted(kind, &record));

        info!(entity_type = %kind, entity_id = %id, "record added");
        Ok(draft)
    }

    /// Merges `changes` into the stored record and queues the full result. Unknown or
    /// deleted records are left alone and yield `None`.
    pub async fn update(&self, id: &str, changes: Value) -> Result<Option<E>, AppError> {
        let kind = E::KIND;
        let id = parse_id(id)?;
        let Value::Object(patch) = changes else {
            return Err(AppError::ValidationError(
                "changes must be a JSON object".to_string(),
            ));
        };

        let guard = self.ctx.ledger.lock_current(kind, &id).await;
        let id = guard.id().clone();
        let Some(record) = self.ctx.store.get(kind, &id).await? else {
            warn!(entity_type = %kind, entity_id = %id, "update of unknown record ignored");
            return Ok(None);
        };
        if record.meta.state.is_tombstone() {
            warn!(entity_type = %kind, entity_id = %id, "update of deleted record ignored");
            return Ok(None);
        }

        let mut document = match record.document {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge_changes(&mut document, patch, true);

        let mut entity: E = serde_json::from_value(Value::Object(document))
            .map_err(|e| AppError::ValidationError(format!("invalid {kind} changes: {e}")))?;
        entity.set_id(id.to_string());
        let mut meta = record.meta;
        meta.apply(SyncEvent::LocalEdit, self.ctx.clock.now())?;
        *entity.sync_meta_mut() = meta;

        let updated = to_stored(&entity)?;
        // A record the server has not seen yet needs a CREATE, not an UPDATE.
        let action = if !updated.meta.ever_synced
            && !self.ctx.queue.has_pending_create(kind, &id).await?
        {
            SyncAction::Create
        } else {
            SyncAction::Update
        };
        self.ctx
            .queue
            .record_mutation(kind, &updated, action, payload_of(&updated)?)
            .await?;
        self.ctx.notifier.publish(EntityChange::upserted(kind, &updated));

        debug!(entity_type = %kind, entity_id = %id, action = %action, "record updated");
        Ok(Some(entity))
    }

    /// Never-synced records vanish immediately; synced ones become tombstones until the
    /// remote delete is confirmed.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let kind = E::KIND;
        let id = parse_id(id)?;
        let guard = self.ctx.ledger.lock_current(kind, &id).await;
        let id = guard.id().clone();
        let Some(mut record) = self.ctx.store.get(kind, &id).await? else {
            warn!(entity_type = %kind, entity_id = %id, "delete of unknown record ignored");
            return Ok(false);
        };

        if !record.meta.ever_synced {
            self.ctx.store.discard_unsynced(kind, &id).await?;
            self.ctx
                .notifier
                .publish(EntityChange::removed(kind, id.as_str()));
            info!(entity_type = %kind, entity_id = %id, "unsynced record discarded");
            return Ok(true);
        }
        if record.meta.state.is_tombstone() {
            return Ok(true);
        }

        record
            .meta
            .apply(SyncEvent::LocalDelete, self.ctx.clock.now())?;
        self.ctx
            .queue
            .record_mutation(
                kind,
                &record,
                SyncAction::Delete,
                OfflinePayload::id_only(id.as_str()),
            )
            .await?;
        self.ctx.notifier.publish(EntityChange::upserted(kind, &record));

        info!(entity_type = %kind, entity_id = %id, "record marked deleted");
        Ok(true)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>, AppError> {
        let kind = E::KIND;
        let id = parse_id(id)?;
        if self.ctx.connectivity.is_online() {
            if let Err(err) = self.ctx.reconciler.refresh_one::<E>(&id).await {
                debug!(entity_type = %kind, entity_id = %id, error = %err, "read-through failed, serving local copy");
            }
        }

        match self.ctx.store.get(kind, &id).await? {
            Some(record) if !record.meta.state.is_tombstone() => Ok(Some(from_stored(record)?)),
            _ => Ok(None),
        }
    }

    /// Visible records in `scope`, refreshed from the server first when online.
    pub async fn get_all(&self, scope: &CollectionScope) -> Result<Vec<E>, AppError> {
        let kind = E::KIND;
        if self.ctx.connectivity.is_online() {
            if let Err(err) = self.ctx.reconciler.reconcile::<E>(scope).await {
                debug!(entity_type = %kind, error = %err, "read-through failed, serving local data");
            }
        }
        self.query_local(&scope.local_filter().visible_only()).await
    }

    pub async fn query_local(&self, filter: &RecordFilter) -> Result<Vec<E>, AppError> {
        self.ctx
            .store
            .query(E::KIND, filter)
            .await?
            .into_iter()
            .map(from_stored)
            .collect()
    }

    /// Local copy without a remote refresh; tombstones included.
    pub async fn get_local(&self, id: &str) -> Result<Option<E>, AppError> {
        let id = parse_id(id)?;
        self.ctx
            .store
            .get(E::KIND, &id)
            .await?
            .map(from_stored)
            .transpose()
    }

    /// Server acknowledged the CREATE of `local_id` as `server_id`.
    pub async fn mark_as_synced(
        &self,
        local_id: &str,
        server_id: &str,
    ) -> Result<Option<E>, AppError> {
        let kind = E::KIND;
        let local_id = parse_id(local_id)?;
        let server_id = parse_id(server_id)?;
        let completed = self
            .ctx
            .queue
            .items_for(kind, &local_id)
            .await?
            .into_iter()
            .find(|item| item.action == SyncAction::Create)
            .map(|item| item.id);

        self.ctx
            .ledger
            .mark_as_synced(kind, &local_id, &server_id, completed)
            .await?
            .map(from_stored)
            .transpose()
    }

    pub async fn mark_as_failed(&self, id: &str, error: &str) -> Result<Option<E>, AppError> {
        let id = parse_id(id)?;
        self.ctx
            .ledger
            .mark_as_failed(E::KIND, &id, error, None)
            .await?
            .map(from_stored)
            .transpose()
    }

    /// Puts a failed record back into the push path. Parked items are re-activated; when
    /// the queue no longer holds any, the record's current content (or its DELETE, for a
    /// failed tombstone) is queued again.
    pub async fn retry(&self, id: &str) -> Result<Option<E>, AppError> {
        let kind = E::KIND;
        let id = parse_id(id)?;
        let guard = self.ctx.ledger.lock_current(kind, &id).await;
        let id = guard.id().clone();
        let Some(mut record) = self.ctx.store.get(kind, &id).await? else {
            warn!(entity_type = %kind, entity_id = %id, "retry of unknown record ignored");
            return Ok(None);
        };
        if !record.meta.state.is_failed() {
            return Ok(Some(from_stored(record)?));
        }

        let items = self.ctx.queue.items_for(kind, &id).await?;
        let deleting = record.meta.state.is_tombstone()
            || items.iter().any(|item| item.action == SyncAction::Delete);
        record.meta.apply(
            SyncEvent::Retry { deleting },
            self.ctx.clock.now(),
        )?;

        if items.is_empty() {
            let (action, payload) = if deleting {
                (SyncAction::Delete, OfflinePayload::id_only(id.as_str()))
            } else if record.meta.ever_synced {
                (SyncAction::Update, payload_of(&record)?)
            } else {
                (SyncAction::Create, payload_of(&record)?)
            };
            self.ctx
                .queue
                .record_mutation(kind, &record, action, payload)
                .await?;
        } else {
            self.ctx.store.put(kind, &record).await?;
            self.ctx.queue.reactivate(kind, &id).await?;
        }
        self.ctx.notifier.publish(EntityChange::upserted(kind, &record));

        info!(entity_type = %kind, entity_id = %id, "sync retry requested");
        Ok(Some(from_stored(record)?))
    }
}
