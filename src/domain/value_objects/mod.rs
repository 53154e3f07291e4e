pub mod offline;

pub use offline::{
    CollectionFetch, EntityId, EntityKind, IndexColumn, OfflinePayload, SyncAction, SyncEvent,
    SyncQueueId, SyncState, SyncStatus,
};
