//! Offline-first storage and synchronisation for assessment data.
//!
//! Every write lands in the local SQLite store and a durable queue first. A
//! [`SyncCoordinator`] drains that queue against the remote API and reconciles
//! server collections back into the store whenever connectivity allows.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::{Repositories, RepositoryContext, SyncCoordinator, SyncHandle, SyncReport};
pub use domain::{EntityId, EntityKind, OfflineRecord, SyncAction, SyncState, SyncStatus};
pub use shared::{AppConfig, AppError};
pub use state::{AppState, StateParts};

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter; a second
/// call is a no-op.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assessment_sync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
