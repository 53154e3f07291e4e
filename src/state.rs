use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::ports::{
    ChangeNotifier, Connectivity, CredentialProvider, LocalStore, RemoteApi,
};
use crate::application::repositories::{Repositories, RepositoryContext};
use crate::application::services::{
    standard_services, NotFoundStrategies, QueueDrainService, Reconciler, RetryPolicy,
    SyncAttempt, SyncCoordinator, SyncHandle, SyncLedger, SyncQueue, SyncTrigger,
};
use crate::infrastructure::database::{ConnectionPool, SqliteLocalStore};
use crate::infrastructure::network::NetworkMonitor;
use crate::infrastructure::offline::{ChangeBus, SyncMetrics};
use crate::infrastructure::remote::HttpRemoteApi;
use crate::shared::clock::{Clock, SystemClock};
use crate::shared::config::AppConfig;

/// Replaceable collaborators of [`AppState::from_parts`].
pub struct StateParts {
    pub store: Arc<dyn LocalStore>,
    pub remote: Arc<dyn RemoteApi>,
    pub network: Arc<NetworkMonitor>,
    pub clock: Arc<dyn Clock>,
    pub not_found: NotFoundStrategies,
}

/// Wired sync engine: repositories for the UI, a coordinator for the background loop.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repositories: Repositories,
    pub coordinator: Arc<SyncCoordinator>,
    pub network: Arc<NetworkMonitor>,
    pub changes: ChangeBus,
    pub queue: SyncQueue,
    pool: Option<ConnectionPool>,
}

impl AppState {
    pub async fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

        let pool =
            ConnectionPool::new(&config.database.url, config.database.max_connections).await?;
        let store = SqliteLocalStore::new(pool.clone());
        store.initialize().await?;
        info!(url = %config.database.url, "local store ready");

        let remote = HttpRemoteApi::new(&config.remote, credentials)?;

        let mut state = Self::from_parts(
            config,
            StateParts {
                store: Arc::new(store),
                remote: Arc::new(remote),
                network: Arc::new(NetworkMonitor::default()),
                clock: Arc::new(SystemClock),
                not_found: NotFoundStrategies::default(),
            },
        );
        state.pool = Some(pool);
        Ok(state)
    }

    pub fn from_parts(config: AppConfig, parts: StateParts) -> Self {
        let StateParts {
            store,
            remote,
            network,
            clock,
            not_found,
        } = parts;

        let changes = ChangeBus::default();
        let notifier: Arc<dyn ChangeNotifier> = Arc::new(changes.clone());
        let connectivity: Arc<dyn Connectivity> = network.clone();
        let metrics = Arc::new(SyncMetrics::new());
        let trigger = SyncTrigger::new();

        let queue = SyncQueue::new(store.clone(), trigger.clone(), clock.clone());
        let ledger = SyncLedger::new(store.clone(), notifier.clone(), clock.clone());
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            remote.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        let attempt = Arc::new(SyncAttempt::new(
            store.clone(),
            remote,
            ledger.clone(),
            clock.clone(),
            not_found,
            RetryPolicy::from(&config.sync),
        ));
        let drain = Arc::new(QueueDrainService::new(
            queue.clone(),
            attempt,
            metrics.clone(),
            config.sync.batch_size,
        ));

        let services = standard_services(
            drain.clone(),
            reconciler.clone(),
            store.clone(),
            metrics.clone(),
            config.sync.organization_id.as_deref(),
        );
        let coordinator = Arc::new(SyncCoordinator::new(
            services,
            drain,
            connectivity.clone(),
            trigger,
            clock.clone(),
            metrics,
            Duration::from_secs(config.sync.sync_interval.max(1)),
        ));

        let repositories = Repositories::new(RepositoryContext {
            store,
            queue: queue.clone(),
            ledger,
            reconciler,
            connectivity,
            notifier,
            clock,
        });

        Self {
            config,
            repositories,
            coordinator,
            network,
            changes,
            queue,
            pool: None,
        }
    }

    /// Starts the background loop when `auto_sync` is on.
    pub fn start_sync(&self) -> Option<SyncHandle> {
        if !self.config.sync.auto_sync {
            info!("auto sync disabled");
            return None;
        }
        Some(self.coordinator.spawn())
    }

    pub async fn shutdown(&self, handle: Option<SyncHandle>) {
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
