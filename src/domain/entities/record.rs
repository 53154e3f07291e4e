use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::domain::entities::offline::{IndexValue, StoredRecord, SyncMeta};
use crate::domain::value_objects::{EntityId, EntityKind, SyncStatus};
use crate::shared::error::AppError;

/// A domain entity the offline engine can store, queue and reconcile.
///
/// The serialized form is the wire/document shape; sync bookkeeping lives in `SyncMeta`
/// and is kept out of it.
pub trait OfflineRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn sync_meta(&self) -> &SyncMeta;
    fn sync_meta_mut(&mut self) -> &mut SyncMeta;

    /// Values for the kind's lifted index columns, in `EntityKind::index_columns` order.
    fn index_values(&self) -> Vec<(&'static str, IndexValue)>;

    fn sync_status(&self) -> SyncStatus {
        self.sync_meta().status()
    }
}

macro_rules! sync_accessors {
    () => {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }

        fn sync_meta(&self) -> &$crate::domain::entities::offline::SyncMeta {
            &self.sync
        }

        fn sync_meta_mut(&mut self) -> &mut $crate::domain::entities::offline::SyncMeta {
            &mut self.sync
        }
    };
}
pub(crate) use sync_accessors;

pub fn document_of<E: OfflineRecord>(entity: &E) -> Result<Value, AppError> {
    Ok(serde_json::to_value(entity)?)
}

pub fn to_stored<E: OfflineRecord>(entity: &E) -> Result<StoredRecord, AppError> {
    let id = EntityId::new(entity.id()).map_err(AppError::ValidationError)?;
    Ok(StoredRecord {
        id,
        meta: entity.sync_meta().clone(),
        document: document_of(entity)?,
        index: entity.index_values(),
    })
}

pub fn from_stored<E: OfflineRecord>(record: StoredRecord) -> Result<E, AppError> {
    let mut entity: E = serde_json::from_value(record.document).map_err(|e| {
        AppError::Serialization(format!(
            "stored {} {} does not decode: {e}",
            E::KIND,
            record.id
        ))
    })?;
    entity.set_id(record.id.into());
    *entity.sync_meta_mut() = record.meta;
    Ok(entity)
}
