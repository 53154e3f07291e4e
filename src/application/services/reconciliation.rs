use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::ports::{
    ChangeNotifier, CollectionScope, LocalStore, ReconcileOutcome, RecordFilter, RemoteApi,
    RemoteError,
};
use crate::domain::entities::{to_stored, EntityChange, OfflineRecord, StoredRecord, SyncMeta};
use crate::domain::value_objects::{CollectionFetch, EntityId, EntityKind};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;

const DETAIL_FETCH_CONCURRENCY: usize = 4;

fn remote_id(value: &Value) -> Option<EntityId> {
    let id = match value.get("id")? {
        Value::String(value) => value.clone(),
        Value::Number(value) => value.to_string(),
        _ => return None,
    };
    EntityId::new(id).ok()
}

fn remote_updated_at(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.get("updated_at")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Pull side of the sync: mirrors a remote collection into the local store without
/// touching records the push path still owns.
pub struct Reconciler {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteApi>,
    notifier: Arc<dyn ChangeNotifier>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteApi>,
        notifier: Arc<dyn ChangeNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            remote,
            notifier,
            clock,
        }
    }

    pub async fn reconcile<E: OfflineRecord>(
        &self,
        scope: &CollectionScope,
    ) -> Result<ReconcileOutcome, AppError> {
        let kind = E::KIND;
        let values = self.fetch(kind, scope).await?;
        let fetched = values.len();

        let (records, remote_ids) = self.decode_all::<E>(values);
        let filter = scope.local_filter();
        let outcome = self
            .store
            .apply_remote(kind, Some(&filter), &records, &remote_ids)
            .await?;
        self.publish(kind, &records, &outcome);

        info!(
            entity_type = %kind,
            fetched,
            upserted = outcome.upserted.len(),
            removed = outcome.removed.len(),
            skipped = outcome.skipped.len(),
            "reconciled remote collection"
        );
        Ok(outcome)
    }

    /// Read-through for a single record. A remote 404 removes a SYNCED local copy.
    pub async fn refresh_one<E: OfflineRecord>(
        &self,
        id: &EntityId,
    ) -> Result<ReconcileOutcome, AppError> {
        let kind = E::KIND;
        let (records, remote_ids) = match self.remote.get(kind, id.as_str()).await {
            Ok(value) => self.decode_all::<E>(vec![value]),
            Err(RemoteError::NotFound(_)) => (Vec::new(), HashSet::new()),
            Err(err) => return Err(err.into()),
        };

        let scope = RecordFilter::new().eq("id", id.as_str());
        let outcome = self
            .store
            .apply_remote(kind, Some(&scope), &records, &remote_ids)
            .await?;
        self.publish(kind, &records, &outcome);
        debug!(
            entity_type = %kind,
            entity_id = %id,
            upserted = outcome.upserted.len(),
            removed = outcome.removed.len(),
            "refreshed record from remote"
        );
        Ok(outcome)
    }

    async fn fetch(&self, kind: EntityKind, scope: &CollectionScope) -> Result<Vec<Value>, AppError> {
        match kind.collection_fetch() {
            CollectionFetch::List => Ok(self.remote.list(kind, scope).await?),
            CollectionFetch::SummariesThenDetails => {
                let summaries = self.remote.list_summaries(kind, scope).await?;
                let ids: Vec<EntityId> = summaries
                    .iter()
                    .filter_map(|summary| {
                        let id = remote_id(summary);
                        if id.is_none() {
                            warn!(entity_type = %kind, "summary without id ignored");
                        }
                        id
                    })
                    .collect();

                let fetched: Vec<(EntityId, Result<Value, RemoteError>)> = stream::iter(ids)
                    .map(|id| async move {
                        let result = self.remote.get(kind, id.as_str()).await;
                        (id, result)
                    })
                    .buffered(DETAIL_FETCH_CONCURRENCY)
                    .collect()
                    .await;

                let mut details = Vec::with_capacity(fetched.len());
                for (id, result) in fetched {
                    match result {
                        Ok(detail) => details.push(detail),
                        // Deleted between the two calls.
                        Err(RemoteError::NotFound(_)) => {
                            debug!(entity_type = %kind, entity_id = %id, "detail vanished")
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Ok(details)
            }
        }
    }

    /// Every id the server returned counts as present, even when its record does not
    /// decode, so an unreadable record never deletes a local copy.
    fn decode_all<E: OfflineRecord>(
        &self,
        values: Vec<Value>,
    ) -> (Vec<StoredRecord>, HashSet<EntityId>) {
        let kind = E::KIND;
        let now = self.clock.now();
        let mut records = Vec::with_capacity(values.len());
        let mut remote_ids = HashSet::with_capacity(values.len());

        for value in values {
            let Some(id) = remote_id(&value) else {
                warn!(entity_type = %kind, "remote record without id ignored");
                continue;
            };
            remote_ids.insert(id.clone());
            let updated_at = remote_updated_at(&value).unwrap_or(now);

            match serde_json::from_value::<E>(value) {
                Ok(mut entity) => {
                    entity.set_id(id.to_string());
                    *entity.sync_meta_mut() = SyncMeta::synced(updated_at);
                    match to_stored(&entity) {
                        Ok(record) => records.push(record),
                        Err(err) => warn!(entity_type = %kind, entity_id = %id, %err, "remote record skipped"),
                    }
                }
                Err(err) => {
                    warn!(entity_type = %kind, entity_id = %id, %err, "remote record does not decode")
                }
            }
        }
        (records, remote_ids)
    }

    fn publish(&self, kind: EntityKind, records: &[StoredRecord], outcome: &ReconcileOutcome) {
        let upserted: HashSet<&EntityId> = outcome.upserted.iter().collect();
        for record in records.iter().filter(|record| upserted.contains(&record.id)) {
            self.notifier.publish(EntityChange::upserted(kind, record));
        }
        for id in &outcome.removed {
            self.notifier
                .publish(EntityChange::removed(kind, id.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Assessment, Dimension};
    use crate::domain::value_objects::SyncStatus;
    use crate::infrastructure::database::{ConnectionPool, SqliteLocalStore};
    use crate::infrastructure::offline::ChangeBus;
    use crate::shared::clock::FixedClock;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteApi for Remote {
            async fn create(&self, kind: EntityKind, body: &Value) -> Result<Value, RemoteError>;
            async fn update(&self, kind: EntityKind, id: &str, body: &Value) -> Result<Value, RemoteError>;
            async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError>;
            async fn get(&self, kind: EntityKind, id: &str) -> Result<Value, RemoteError>;
            async fn list(&self, kind: EntityKind, scope: &CollectionScope) -> Result<Vec<Value>, RemoteError>;
            async fn list_summaries(&self, kind: EntityKind, scope: &CollectionScope) -> Result<Vec<Value>, RemoteError>;
        }
    }

    async fn setup(remote: MockRemote) -> (Reconciler, Arc<SqliteLocalStore>) {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let store = Arc::new(SqliteLocalStore::new(pool));
        store.initialize().await.unwrap();
        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(remote),
            Arc::new(ChangeBus::default()),
            Arc::new(FixedClock::at_millis(5_000)),
        );
        (reconciler, store)
    }

    fn id(value: &str) -> EntityId {
        EntityId::new(value).unwrap()
    }

    #[tokio::test]
    async fn pull_keeps_local_edits_and_drops_vanished_records() {
        let mut remote = MockRemote::new();
        remote.expect_list().returning(|_, _| {
            Ok(vec![
                json!({"id": "d1", "organization_id": "org-1", "name": "Remote name"}),
                json!({"id": "d3", "organization_id": "org-1", "name": "New on server"}),
            ])
        });
        let (reconciler, store) = setup(remote).await;

        let mut edited = Dimension::new("org-1", "Local edit");
        edited.id = "d1".into();
        edited.sync = SyncMeta::synced(Utc::now());
        edited
            .sync
            .apply(crate::domain::value_objects::SyncEvent::LocalEdit, Utc::now())
            .unwrap();
        let mut stale = Dimension::new("org-1", "Deleted on server");
        stale.id = "d2".into();
        stale.sync = SyncMeta::synced(Utc::now());
        store
            .bulk_put(
                EntityKind::Dimension,
                &[to_stored(&edited).unwrap(), to_stored(&stale).unwrap()],
            )
            .await
            .unwrap();

        let outcome = reconciler
            .reconcile::<Dimension>(&CollectionScope::by("organization_id", "org-1"))
            .await
            .unwrap();

        assert_eq!(outcome.skipped, vec![id("d1")]);
        assert_eq!(outcome.removed, vec![id("d2")]);
        assert_eq!(outcome.upserted, vec![id("d3")]);

        let kept = store.get(EntityKind::Dimension, &id("d1")).await.unwrap().unwrap();
        assert_eq!(kept.status(), SyncStatus::Pending);
        assert_eq!(kept.document["name"], json!("Local edit"));
    }

    #[tokio::test]
    async fn assessments_are_pulled_as_summaries_then_details() {
        let mut remote = MockRemote::new();
        remote
            .expect_list_summaries()
            .returning(|_, _| Ok(vec![json!({"id": "a1"}), json!({"id": "a2"})]));
        remote.expect_list().never();
        remote.expect_get().returning(|_, id| match id {
            "a1" => Ok(json!({
                "id": "a1",
                "organization_id": "org-1",
                "name": "Baseline",
                "updated_at": "2024-05-01T10:00:00Z"
            })),
            _ => Err(RemoteError::NotFound(format!("assessments/{id}"))),
        });
        let (reconciler, store) = setup(remote).await;

        let outcome = reconciler
            .reconcile::<Assessment>(&CollectionScope::all())
            .await
            .unwrap();

        assert_eq!(outcome.upserted, vec![id("a1")]);
        let stored = store.get(EntityKind::Assessment, &id("a1")).await.unwrap().unwrap();
        assert_eq!(stored.status(), SyncStatus::Synced);
        assert_eq!(
            stored.meta.updated_at,
            DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap()
        );
        assert!(store.get(EntityKind::Assessment, &id("a2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_records_do_not_delete_local_copies() {
        let mut remote = MockRemote::new();
        remote
            .expect_list()
            .returning(|_, _| Ok(vec![json!({"id": "d1", "name": 17})]));
        let (reconciler, store) = setup(remote).await;

        let mut local = Dimension::new("org-1", "Processes");
        local.id = "d1".into();
        local.sync = SyncMeta::synced(Utc::now());
        store
            .put(EntityKind::Dimension, &to_stored(&local).unwrap())
            .await
            .unwrap();

        let outcome = reconciler
            .reconcile::<Dimension>(&CollectionScope::all())
            .await
            .unwrap();

        assert!(outcome.removed.is_empty());
        assert!(store.get(EntityKind::Dimension, &id("d1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refresh_of_a_missing_record_removes_the_synced_copy() {
        let mut remote = MockRemote::new();
        remote
            .expect_get()
            .returning(|_, id| Err(RemoteError::NotFound(format!("dimensions/{id}"))));
        let (reconciler, store) = setup(remote).await;

        let mut local = Dimension::new("org-1", "Processes");
        local.id = "d1".into();
        local.sync = SyncMeta::synced(Utc::now());
        store
            .put(EntityKind::Dimension, &to_stored(&local).unwrap())
            .await
            .unwrap();

        let outcome = reconciler.refresh_one::<Dimension>(&id("d1")).await.unwrap();

        assert_eq!(outcome.removed, vec![id("d1")]);
        assert!(store.get(EntityKind::Dimension, &id("d1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remote_failures_abort_the_pull() {
        let mut remote = MockRemote::new();
        remote
            .expect_list()
            .returning(|_, _| Err(RemoteError::Connectivity("timed out".into())));
        let (reconciler, _store) = setup(remote).await;

        let err = reconciler
            .reconcile::<Dimension>(&CollectionScope::all())
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }
}
