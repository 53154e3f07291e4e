pub mod entity_change;
pub mod stored_record;
pub mod sync_meta;
pub mod sync_queue_item;

pub use entity_change::{ChangeKind, EntityChange};
pub use stored_record::{IndexValue, StoredRecord};
pub use sync_meta::{SyncColumns, SyncMeta};
pub use sync_queue_item::{NewSyncQueueItem, SyncQueueItem};
