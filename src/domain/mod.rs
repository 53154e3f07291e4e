pub mod entities;
pub mod value_objects;

pub use entities::{
    Assessment, Cooperation, CooperationUser, DigitalisationGap, DigitalisationLevel, Dimension,
    DimensionAssessment, OfflineRecord, Recommendation,
};
pub use value_objects::{EntityId, EntityKind, SyncAction, SyncState, SyncStatus};
