pub mod assessment;
pub mod cooperation;
pub mod cooperation_user;
pub mod digitalisation_gap;
pub mod digitalisation_level;
pub mod dimension;
pub mod dimension_assessment;
pub mod offline;
pub mod recommendation;
pub mod record;

pub use assessment::Assessment;
pub use cooperation::Cooperation;
pub use cooperation_user::CooperationUser;
pub use digitalisation_gap::DigitalisationGap;
pub use digitalisation_level::DigitalisationLevel;
pub use dimension::Dimension;
pub use dimension_assessment::DimensionAssessment;
pub use offline::{
    ChangeKind, EntityChange, IndexValue, NewSyncQueueItem, StoredRecord, SyncColumns,
    SyncMeta, SyncQueueItem,
};
pub use recommendation::Recommendation;
pub use record::{document_of, from_stored, to_stored, OfflineRecord};
