pub mod entity_locks;
pub mod reconciliation;
pub mod sync_attempt;
pub mod sync_coordinator;
pub mod sync_ledger;
pub mod sync_queue;
pub mod sync_service;

pub use entity_locks::{EntityGuard, EntityLocks};
pub use reconciliation::Reconciler;
pub use sync_attempt::{
    fail_on_not_found, recreate_on_update, AttemptOutcome, NotFoundResolution,
    NotFoundStrategies, NotFoundStrategy, RetryPolicy, SyncAttempt,
};
pub use sync_coordinator::{
    CoordinatorStatus, ServiceError, SyncCoordinator, SyncHandle, SyncReport, SyncTriggerKind,
};
pub use sync_ledger::SyncLedger;
pub use sync_queue::{SyncQueue, SyncTrigger};
pub use sync_service::{
    standard_services, FixedScopes, LocalParentScopes, PullService, QueueDrainService,
    ScopeSource, ServiceReport, SyncService,
};
