pub mod entity_id;
pub mod entity_kind;
pub mod payload;
pub mod sync_action;
pub mod sync_queue_id;
pub mod sync_status;

pub use entity_id::EntityId;
pub use entity_kind::{CollectionFetch, EntityKind, IndexColumn};
pub use payload::OfflinePayload;
pub use sync_action::SyncAction;
pub use sync_queue_id::SyncQueueId;
pub use sync_status::{SyncEvent, SyncState, SyncStatus};
