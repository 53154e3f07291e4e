#![allow(dead_code)]

pub mod fake_remote;

use std::sync::Arc;

use assessment_sync::application::ports::{Connectivity, LocalStore, RecordFilter};
use assessment_sync::application::services::NotFoundStrategies;
use assessment_sync::domain::entities::StoredRecord;
use assessment_sync::infrastructure::database::{ConnectionPool, SqliteLocalStore};
use assessment_sync::infrastructure::network::NetworkMonitor;
use assessment_sync::shared::clock::FixedClock;
use assessment_sync::shared::config::AppConfig;
use assessment_sync::{AppState, EntityKind, StateParts};

pub use fake_remote::{FakeRemote, RemoteCall};

pub const START_MILLIS: i64 = 1_700_000_000_000;

/// One client session: its own store, clock and connectivity, talking to a shared remote.
pub struct Session {
    pub state: AppState,
    pub store: Arc<SqliteLocalStore>,
    pub remote: Arc<FakeRemote>,
    pub clock: Arc<FixedClock>,
    pub network: Arc<NetworkMonitor>,
}

impl Session {
    pub fn go_online(&self) {
        self.network.set_online(true);
        self.remote.set_reachable(true);
    }

    pub fn go_offline(&self) {
        self.network.set_online(false);
        self.remote.set_reachable(false);
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    pub async fn stored(&self, kind: EntityKind, id: &str) -> Option<StoredRecord> {
        let id = assessment_sync::EntityId::new(id).expect("entity id");
        self.store.get(kind, &id).await.expect("store get")
    }

    pub async fn all_stored(&self, kind: EntityKind) -> Vec<StoredRecord> {
        self.store
            .query(kind, &RecordFilter::new())
            .await
            .expect("store query")
    }

    pub async fn queue_len(&self) -> u64 {
        self.store.queue_len().await.expect("queue len")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.sync.auto_sync = false;
    config
}

pub async fn session(online: bool) -> Session {
    session_with(test_config(), Arc::new(FakeRemote::new()), online).await
}

pub async fn session_with(config: AppConfig, remote: Arc<FakeRemote>, online: bool) -> Session {
    let pool = ConnectionPool::from_memory().await.expect("in-memory sqlite");
    let store = Arc::new(SqliteLocalStore::new(pool));
    store.initialize().await.expect("migrations");

    let clock = Arc::new(FixedClock::at_millis(START_MILLIS));
    let network = Arc::new(NetworkMonitor::new(online));
    remote.set_reachable(online);

    let state = AppState::from_parts(
        config,
        StateParts {
            store: store.clone(),
            remote: remote.clone(),
            network: network.clone(),
            clock: clock.clone(),
            not_found: NotFoundStrategies::default(),
        },
    );

    Session {
        state,
        store,
        remote,
        clock,
        network,
    }
}

/// Second session against the same remote, e.g. another device of the same user.
pub async fn second_session(first: &Session) -> Session {
    session_with(test_config(), first.remote.clone(), first.is_online()).await
}
