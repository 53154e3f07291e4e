use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::local_store::RecordFilter;
use crate::domain::value_objects::EntityKind;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The server could not be reached; the request may be retried unchanged.
    #[error("remote unreachable: {0}")]
    Connectivity(String),

    #[error("remote record not found: {0}")]
    NotFound(String),

    #[error("remote rejected credentials: {0}")]
    Unauthorized(String),

    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("remote response could not be decoded: {0}")]
    Decode(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Filter scope of a collection pull, e.g. `organization_id = X`. Sent as query
/// parameters and reused as the local reconciliation filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CollectionScope {
    params: Vec<(String, String)>,
}

impl CollectionScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            params: vec![(column.into(), value.into())],
        }
    }

    pub fn and(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((column.into(), value.into()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn local_filter(&self) -> RecordFilter {
        self.params
            .iter()
            .fold(RecordFilter::new(), |filter, (column, value)| {
                filter.eq(column.clone(), value.clone())
            })
    }
}

/// Black-box REST/JSON backend keyed by entity ids.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create(&self, kind: EntityKind, body: &Value) -> Result<Value, RemoteError>;
    async fn update(&self, kind: EntityKind, id: &str, body: &Value)
        -> Result<Value, RemoteError>;
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), RemoteError>;
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Value, RemoteError>;
    async fn list(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError>;
    /// Summary view of a collection; full records are fetched with [`RemoteApi::get`].
    async fn list_summaries(
        &self,
        kind: EntityKind,
        scope: &CollectionScope,
    ) -> Result<Vec<Value>, RemoteError>;
}
