use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of pushing one queue item, as counted by [`SyncMetrics`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PushResult {
    Pushed,
    Retrying,
    Parked,
    Dropped,
    Deferred,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetricsSnapshot {
    pub total_pushed: u64,
    pub total_retrying: u64,
    pub total_parked: u64,
    pub total_dropped: u64,
    pub total_deferred: u64,
    pub pull_runs: u64,
    pub pull_failures: u64,
    pub consecutive_failure: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_trigger: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_error_count: Option<u32>,
}

#[derive(Default, Clone)]
struct LastRun {
    trigger: Option<String>,
    duration_ms: Option<u64>,
    error_count: Option<u32>,
}

/// Counters for sync outcomes. Owned by the coordinator.
pub struct SyncMetrics {
    pushed: AtomicU64,
    retrying: AtomicU64,
    parked: AtomicU64,
    dropped: AtomicU64,
    deferred: AtomicU64,
    pull_runs: AtomicU64,
    pull_failures: AtomicU64,
    consecutive_failure: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    last_run: Mutex<LastRun>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            pushed: AtomicU64::new(0),
            retrying: AtomicU64::new(0),
            parked: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            pull_runs: AtomicU64::new(0),
            pull_failures: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            last_run: Mutex::new(LastRun::default()),
        }
    }

    pub fn record_push(&self, result: PushResult) {
        let counter = match result {
            PushResult::Pushed => &self.pushed,
            PushResult::Retrying => &self.retrying,
            PushResult::Parked => &self.parked,
            PushResult::Dropped => &self.dropped,
            PushResult::Deferred => &self.deferred,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        match result {
            PushResult::Pushed => self.record_success(),
            PushResult::Retrying | PushResult::Parked | PushResult::Dropped => {
                self.record_failure()
            }
            PushResult::Deferred => {}
        }
    }

    pub fn record_pull(&self, succeeded: bool) {
        self.pull_runs.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.record_success();
        } else {
            self.pull_failures.fetch_add(1, Ordering::Relaxed);
            self.record_failure();
        }
    }

    pub fn record_run(&self, trigger: &str, duration_ms: u64, error_count: u32) {
        if let Ok(mut guard) = self.last_run.lock() {
            guard.trigger = Some(trigger.to_string());
            guard.duration_ms = Some(duration_ms);
            guard.error_count = Some(error_count);
        }
    }

    fn record_success(&self) {
        self.last_success_ms.store(current_unix_ms(), Ordering::Relaxed);
        self.consecutive_failure.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.last_failure_ms.store(current_unix_ms(), Ordering::Relaxed);
        self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let last_run = self
            .last_run
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncMetricsSnapshot {
            total_pushed: self.pushed.load(Ordering::Relaxed),
            total_retrying: self.retrying.load(Ordering::Relaxed),
            total_parked: self.parked.load(Ordering::Relaxed),
            total_dropped: self.dropped.load(Ordering::Relaxed),
            total_deferred: self.deferred.load(Ordering::Relaxed),
            pull_runs: self.pull_runs.load(Ordering::Relaxed),
            pull_failures: self.pull_failures.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_trigger: last_run.trigger,
            last_duration_ms: last_run.duration_ms,
            last_error_count: last_run.error_count,
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{PushResult, SyncMetrics};

    #[test]
    fn record_push_outcomes() {
        let metrics = SyncMetrics::new();

        metrics.record_push(PushResult::Pushed);
        metrics.record_push(PushResult::Retrying);
        metrics.record_push(PushResult::Parked);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_pushed, 1);
        assert_eq!(snapshot.total_retrying, 1);
        assert_eq!(snapshot.total_parked, 1);
        assert_eq!(snapshot.consecutive_failure, 2);
        assert!(snapshot.last_success_ms.is_some());
        assert!(snapshot.last_failure_ms.is_some());

        metrics.record_push(PushResult::Pushed);
        assert_eq!(metrics.snapshot().consecutive_failure, 0);
    }

    #[test]
    fn deferred_pushes_do_not_count_as_failures() {
        let metrics = SyncMetrics::new();
        metrics.record_push(PushResult::Deferred);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_deferred, 1);
        assert_eq!(snapshot.consecutive_failure, 0);
        assert_eq!(snapshot.last_failure_ms, None);
    }

    #[test]
    fn record_run_keeps_last_run_details() {
        let metrics = SyncMetrics::new();
        metrics.record_pull(false);
        metrics.record_run("interval", 120, 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pull_runs, 1);
        assert_eq!(snapshot.pull_failures, 1);
        assert_eq!(snapshot.last_trigger.as_deref(), Some("interval"));
        assert_eq!(snapshot.last_duration_ms, Some(120));
        assert_eq!(snapshot.last_error_count, Some(1));
    }
}
