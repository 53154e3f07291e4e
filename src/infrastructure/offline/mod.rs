pub mod change_bus;
pub mod metrics;

pub use change_bus::ChangeBus;
pub use metrics::{PushResult, SyncMetrics, SyncMetricsSnapshot};
