use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::sync_queue::SyncTrigger;
use super::sync_service::{QueueDrainService, ServiceReport, SyncService};
use crate::application::ports::Connectivity;
use crate::domain::value_objects::{EntityId, EntityKind};
use crate::infrastructure::offline::{SyncMetrics, SyncMetricsSnapshot};
use crate::shared::clock::Clock;
use crate::shared::error::AppError;

/// What started a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTriggerKind {
    Startup,
    Interval,
    Reconnected,
    Mutation,
    Manual,
}

impl SyncTriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTriggerKind::Startup => "startup",
            SyncTriggerKind::Interval => "interval",
            SyncTriggerKind::Reconnected => "reconnected",
            SyncTriggerKind::Mutation => "mutation",
            SyncTriggerKind::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncTriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub trigger: SyncTriggerKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub totals: ServiceReport,
    pub errors: Vec<ServiceError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorStatus {
    pub is_syncing: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_report: Option<SyncReport>,
    pub sync_errors: u32,
}

/// Runs the sync services in order on every trigger. Only one run drains the queue at a
/// time; overlapping triggers are skipped.
pub struct SyncCoordinator {
    services: Vec<Arc<dyn SyncService>>,
    drain: Arc<QueueDrainService>,
    connectivity: Arc<dyn Connectivity>,
    trigger: SyncTrigger,
    clock: Arc<dyn Clock>,
    metrics: Arc<SyncMetrics>,
    interval: Duration,
    drain_guard: Mutex<()>,
    status: RwLock<CoordinatorStatus>,
}

impl SyncCoordinator {
    pub fn new(
        services: Vec<Arc<dyn SyncService>>,
        drain: Arc<QueueDrainService>,
        connectivity: Arc<dyn Connectivity>,
        trigger: SyncTrigger,
        clock: Arc<dyn Clock>,
        metrics: Arc<SyncMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            services,
            drain,
            connectivity,
            trigger,
            clock,
            metrics,
            interval,
            drain_guard: Mutex::new(()),
            status: RwLock::new(CoordinatorStatus::default()),
        }
    }

    pub async fn sync_all(&self) -> Option<SyncReport> {
        self.run(SyncTriggerKind::Manual).await
    }

    /// Returns `None` when the run was skipped (offline or already syncing).
    pub async fn run(&self, trigger: SyncTriggerKind) -> Option<SyncReport> {
        if !self.connectivity.is_online() {
            debug!(%trigger, "offline, sync skipped");
            return None;
        }
        let Ok(_guard) = self.drain_guard.try_lock() else {
            debug!(%trigger, "already syncing, sync skipped");
            return None;
        };

        self.status.write().await.is_syncing = true;
        info!(%trigger, services = self.services.len(), "sync started");
        let started_at = self.clock.now();
        let timer = Instant::now();

        let mut totals = ServiceReport::default();
        let mut errors = Vec::new();
        for service in &self.services {
            if !self.connectivity.is_online() {
                info!(%trigger, "connectivity lost, remaining services skipped");
                break;
            }
            match service.run().await {
                Ok(report) => totals.merge(&report),
                Err(err) => {
                    error!(service = service.name(), error = %err, "sync service failed");
                    errors.push(ServiceError {
                        service: service.name().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let report = SyncReport {
            trigger,
            started_at,
            finished_at: self.clock.now(),
            totals,
            errors,
        };
        let duration_ms = timer.elapsed().as_millis() as u64;
        self.metrics
            .record_run(trigger.as_str(), duration_ms, report.errors.len() as u32);

        {
            let mut status = self.status.write().await;
            status.is_syncing = false;
            status.last_sync = Some(report.finished_at);
            status.sync_errors += report.errors.len() as u32;
            status.last_report = Some(report.clone());
        }

        info!(
            %trigger,
            duration_ms,
            pushed = report.totals.pushed,
            failed = report.totals.failed(),
            pulled = report.totals.pulled,
            removed = report.totals.removed,
            errors = report.errors.len(),
            "sync finished"
        );
        Some(report)
    }

    /// Foreground push of one entity. Waits for a running sync instead of skipping and
    /// hands the remote error back to the caller; the local write is kept either way.
    pub async fn sync_entity_now(&self, kind: EntityKind, id: &EntityId) -> Result<(), AppError> {
        if !self.connectivity.is_online() {
            return Err(AppError::Connectivity("device is offline".to_string()));
        }
        let _guard = self.drain_guard.lock().await;
        debug!(entity_type = %kind, entity_id = %id, "foreground sync");
        self.drain.push_entity(kind, id).await
    }

    pub async fn status(&self) -> CoordinatorStatus {
        self.status.read().await.clone()
    }

    pub fn metrics(&self) -> SyncMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Starts the trigger loop: a run at start, every interval, on each offline to
    /// online transition and after local mutations. Dropping the handle stops the loop.
    pub fn spawn(self: &Arc<Self>) -> SyncHandle {
        let coordinator = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut online = coordinator.connectivity.subscribe();
            let mut was_online = *online.borrow_and_update();
            let mut watch_online = true;

            let mut ticker = tokio::time::interval(coordinator.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut first_tick = true;

            info!(interval_secs = coordinator.interval.as_secs(), "sync loop started");
            loop {
                let trigger = tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        if std::mem::take(&mut first_tick) {
                            SyncTriggerKind::Startup
                        } else {
                            SyncTriggerKind::Interval
                        }
                    }
                    changed = online.changed(), if watch_online => {
                        if changed.is_err() {
                            watch_online = false;
                            continue;
                        }
                        let now_online = *online.borrow_and_update();
                        let reconnected = now_online && !was_online;
                        was_online = now_online;
                        if !reconnected {
                            continue;
                        }
                        info!("connectivity restored");
                        SyncTriggerKind::Reconnected
                    }
                    _ = coordinator.trigger.fired() => SyncTriggerKind::Mutation,
                };
                coordinator.run(trigger).await;
            }
            info!("sync loop stopped");
        });

        SyncHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owner of a running sync loop.
pub struct SyncHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Stops the loop after the run in progress, if any, and waits for it.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = self.task.await {
            error!(error = %err, "sync loop task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::sync_attempt::{NotFoundStrategies, RetryPolicy, SyncAttempt};
    use crate::application::services::sync_ledger::SyncLedger;
    use crate::application::services::sync_queue::SyncQueue;
    use crate::application::ports::{CollectionScope, RemoteApi, RemoteError};
    use crate::infrastructure::database::{ConnectionPool, SqliteLocalStore};
    use crate::infrastructure::network::NetworkMonitor;
    use crate::infrastructure::offline::ChangeBus;
    use crate::shared::clock::FixedClock;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Unreachable;

    #[async_trait]
    impl RemoteApi for Unreachable {
        async fn create(&self, _: EntityKind, _: &Value) -> Result<Value, RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
        async fn update(&self, _: EntityKind, _: &str, _: &Value) -> Result<Value, RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
        async fn delete(&self, _: EntityKind, _: &str) -> Result<(), RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
        async fn get(&self, _: EntityKind, _: &str) -> Result<Value, RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
        async fn list(&self, _: EntityKind, _: &CollectionScope) -> Result<Vec<Value>, RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
        async fn list_summaries(
            &self,
            _: EntityKind,
            _: &CollectionScope,
        ) -> Result<Vec<Value>, RemoteError> {
            Err(RemoteError::Connectivity("unreachable".into()))
        }
    }

    /// Counts runs; optionally blocks until released.
    struct CountingService {
        name: &'static str,
        runs: AtomicU32,
        fail: bool,
        gate: Option<Arc<tokio::sync::Notify>>,
    }

    impl CountingService {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                runs: AtomicU32::new(0),
                fail: false,
                gate: None,
            })
        }

        fn runs(&self) -> u32 {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncService for CountingService {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self) -> Result<ServiceReport, AppError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(AppError::Remote {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(ServiceReport {
                pulled: 1,
                ..Default::default()
            })
        }
    }

    async fn coordinator(
        services: Vec<Arc<dyn SyncService>>,
        monitor: Arc<NetworkMonitor>,
        trigger: SyncTrigger,
    ) -> Arc<SyncCoordinator> {
        coordinator_every(services, monitor, trigger, Duration::from_secs(300)).await
    }

    async fn coordinator_every(
        services: Vec<Arc<dyn SyncService>>,
        monitor: Arc<NetworkMonitor>,
        trigger: SyncTrigger,
        interval: Duration,
    ) -> Arc<SyncCoordinator> {
        let pool = ConnectionPool::from_memory().await.unwrap();
        let store = Arc::new(SqliteLocalStore::new(pool));
        store.initialize().await.unwrap();
        let clock = Arc::new(FixedClock::at_millis(0));
        let ledger = SyncLedger::new(store.clone(), Arc::new(ChangeBus::default()), clock.clone());
        let attempt = SyncAttempt::new(
            store.clone(),
            Arc::new(Unreachable),
            ledger,
            clock.clone(),
            NotFoundStrategies::default(),
            RetryPolicy::default(),
        );
        let metrics = Arc::new(SyncMetrics::new());
        let drain = Arc::new(QueueDrainService::new(
            SyncQueue::new(store, trigger.clone(), clock.clone()),
            Arc::new(attempt),
            metrics.clone(),
            10,
        ));
        Arc::new(SyncCoordinator::new(
            services,
            drain,
            monitor,
            trigger,
            clock,
            metrics,
            interval,
        ))
    }

    async fn wait_for_runs(service: &CountingService, runs: u32) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while service.runs() < runs {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sync loop did not run in time");
    }

    #[tokio::test]
    async fn failing_service_does_not_stop_the_others() {
        let failing = Arc::new(CountingService {
            name: "failing",
            runs: AtomicU32::new(0),
            fail: true,
            gate: None,
        });
        let healthy = CountingService::new("healthy");
        let services: Vec<Arc<dyn SyncService>> = vec![failing.clone(), healthy.clone()];
        let sync = coordinator(
            services,
            Arc::new(NetworkMonitor::new(true)),
            SyncTrigger::new(),
        )
        .await;

        let report = sync.sync_all().await.unwrap();

        assert_eq!(healthy.runs(), 1);
        assert_eq!(report.totals.pulled, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].service, "failing");
        let status = sync.status().await;
        assert!(!status.is_syncing);
        assert_eq!(status.sync_errors, 1);
        assert_eq!(sync.metrics().last_trigger.as_deref(), Some("manual"));
    }

    #[tokio::test]
    async fn offline_runs_are_skipped() {
        let service = CountingService::new("pull");
        let sync = coordinator(
            vec![service.clone() as Arc<dyn SyncService>],
            Arc::new(NetworkMonitor::new(false)),
            SyncTrigger::new(),
        )
        .await;

        assert!(sync.sync_all().await.is_none());
        assert_eq!(service.runs(), 0);
        assert!(sync
            .sync_entity_now(EntityKind::Dimension, &EntityId::new("d1").unwrap())
            .await
            .unwrap_err()
            .is_connectivity());
    }

    #[tokio::test]
    async fn overlapping_runs_are_skipped() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let slow = Arc::new(CountingService {
            name: "slow",
            runs: AtomicU32::new(0),
            fail: false,
            gate: Some(gate.clone()),
        });
        let sync = coordinator(
            vec![slow.clone() as Arc<dyn SyncService>],
            Arc::new(NetworkMonitor::new(true)),
            SyncTrigger::new(),
        )
        .await;

        let running = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.sync_all().await })
        };
        while slow.runs() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(sync.sync_all().await.is_none());
        assert!(sync.status().await.is_syncing);

        gate.notify_one();
        assert!(running.await.unwrap().is_some());
        assert_eq!(slow.runs(), 1);
    }

    #[tokio::test]
    async fn loop_runs_at_start_and_on_every_interval() {
        let service = CountingService::new("pull");
        let sync = coordinator_every(
            vec![service.clone() as Arc<dyn SyncService>],
            Arc::new(NetworkMonitor::new(true)),
            SyncTrigger::new(),
            Duration::from_millis(50),
        )
        .await;

        let handle = sync.spawn();
        wait_for_runs(&service, 3).await;
        handle.shutdown().await;

        assert_eq!(sync.metrics().last_trigger.as_deref(), Some("interval"));
    }

    #[tokio::test]
    async fn reconnecting_triggers_a_run() {
        let service = CountingService::new("pull");
        let monitor = Arc::new(NetworkMonitor::new(true));
        let sync = coordinator(
            vec![service.clone() as Arc<dyn SyncService>],
            monitor.clone(),
            SyncTrigger::new(),
        )
        .await;

        let handle = sync.spawn();
        wait_for_runs(&service, 1).await;

        monitor.set_online(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.runs(), 1);

        monitor.set_online(true);
        wait_for_runs(&service, 2).await;
        handle.shutdown().await;

        assert_eq!(sync.metrics().last_trigger.as_deref(), Some("reconnected"));
    }

    #[tokio::test]
    async fn mutations_wake_the_loop() {
        let service = CountingService::new("drain");
        let trigger = SyncTrigger::new();
        let sync = coordinator(
            vec![service.clone() as Arc<dyn SyncService>],
            Arc::new(NetworkMonitor::new(true)),
            trigger.clone(),
        )
        .await;

        let handle = sync.spawn();
        wait_for_runs(&service, 1).await;

        trigger.fire();
        wait_for_runs(&service, 2).await;

        handle.shutdown().await;
        trigger.fire();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(service.runs(), 2);
    }
}
