use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::offline_repository::RepositoryContext;
use crate::application::ports::{CollectionScope, LocalStore, RemoteApi, RemoteError};
use crate::application::services::{Reconciler, SyncLedger, SyncQueue, SyncTrigger};
use crate::domain::value_objects::EntityKind;
use crate::infrastructure::database::{ConnectionPool, SqliteLocalStore};
use crate::infrastructure::network::NetworkMonitor;
use crate::infrastructure::offline::ChangeBus;
use crate::shared::clock::FixedClock;

pub(crate) struct NoRemote;

#[async_trait]
impl RemoteApi for NoRemote {
    async fn create(&self, _: EntityKind, _: &Value) -> Result<Value, RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
    async fn update(&self, _: EntityKind, _: &str, _: &Value) -> Result<Value, RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
    async fn delete(&self, _: EntityKind, _: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
    async fn get(&self, _: EntityKind, _: &str) -> Result<Value, RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
    async fn list(&self, _: EntityKind, _: &CollectionScope) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
    async fn list_summaries(
        &self,
        _: EntityKind,
        _: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::Connectivity("offline".into()))
    }
}

pub(crate) struct OfflineContext {
    pub ctx: RepositoryContext,
    pub store: Arc<SqliteLocalStore>,
    pub bus: ChangeBus,
}

/// Repository context over an in-memory store with the device offline.
pub(crate) async fn offline_context() -> OfflineContext {
    let pool = ConnectionPool::from_memory().await.unwrap();
    let store = Arc::new(SqliteLocalStore::new(pool));
    store.initialize().await.unwrap();

    let local: Arc<dyn LocalStore> = store.clone();
    let clock = Arc::new(FixedClock::at_millis(1_700_000_000_000));
    let bus = ChangeBus::default();
    let notifier = Arc::new(bus.clone());
    let remote: Arc<dyn RemoteApi> = Arc::new(NoRemote);

    let ctx = RepositoryContext {
        store: local.clone(),
        queue: SyncQueue::new(local.clone(), SyncTrigger::new(), clock.clone()),
        ledger: SyncLedger::new(local.clone(), notifier.clone(), clock.clone()),
        reconciler: Arc::new(Reconciler::new(
            local,
            remote,
            notifier.clone(),
            clock.clone(),
        )),
        connectivity: Arc::new(NetworkMonitor::new(false)),
        notifier,
        clock,
    };
    OfflineContext { ctx, store, bus }
}
