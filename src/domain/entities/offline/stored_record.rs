use serde_json::Value;

use crate::domain::entities::offline::SyncMeta;
use crate::domain::value_objects::{EntityId, SyncStatus};

/// Value of one lifted index column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Text(String),
    Integer(i64),
    Null,
}

impl IndexValue {
    pub fn text(value: &str) -> Self {
        IndexValue::Text(value.to_string())
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        value.map(IndexValue::text).unwrap_or(IndexValue::Null)
    }
}

/// Kind-erased row of an entity table: the JSON document plus its sync bookkeeping and
/// lifted index columns.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: EntityId,
    pub meta: SyncMeta,
    pub document: Value,
    pub index: Vec<(&'static str, IndexValue)>,
}

impl StoredRecord {
    pub fn status(&self) -> SyncStatus {
        self.meta.status()
    }

    /// Moves the record to a new key, keeping the document's `id` in step.
    pub fn rekeyed(mut self, id: EntityId) -> Self {
        if let Value::Object(map) = &mut self.document {
            map.insert("id".to_string(), Value::String(id.as_str().to_string()));
        }
        self.id = id;
        self
    }
}
