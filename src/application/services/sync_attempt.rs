use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::sync_ledger::SyncLedger;
use crate::application::ports::{LocalStore, RemoteApi, RemoteError};
use crate::domain::entities::{NewSyncQueueItem, SyncQueueItem};
use crate::domain::value_objects::{EntityId, EntityKind, OfflinePayload, SyncAction};
use crate::infrastructure::offline::PushResult;
use crate::shared::clock::Clock;
use crate::shared::config::{OnExhaustedRetries, SyncConfig};
use crate::shared::error::AppError;

/// What to do when the server answers 404 for a queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundResolution {
    /// Count it as an ordinary remote failure.
    Fail,
    /// Send the payload again as a CREATE and rekey to the new server id.
    RecreateAsCreate,
    /// The remote side no longer has the record; treat the mutation as done.
    AlreadyGone,
}

pub type NotFoundStrategy = Arc<dyn Fn(&SyncQueueItem) -> NotFoundResolution + Send + Sync>;

pub fn fail_on_not_found() -> NotFoundStrategy {
    Arc::new(|_| NotFoundResolution::Fail)
}

/// Dependent records that the server may have dropped: an UPDATE that 404s recreates.
pub fn recreate_on_update() -> NotFoundStrategy {
    Arc::new(|item| match item.action {
        SyncAction::Update => NotFoundResolution::RecreateAsCreate,
        _ => NotFoundResolution::Fail,
    })
}

/// Per-kind not-found handling. A DELETE answered with 404 is always `AlreadyGone`.
#[derive(Clone)]
pub struct NotFoundStrategies {
    default: NotFoundStrategy,
    per_kind: HashMap<EntityKind, NotFoundStrategy>,
}

impl NotFoundStrategies {
    pub fn new(default: NotFoundStrategy) -> Self {
        Self {
            default,
            per_kind: HashMap::new(),
        }
    }

    pub fn with(mut self, kind: EntityKind, strategy: NotFoundStrategy) -> Self {
        self.per_kind.insert(kind, strategy);
        self
    }

    pub fn resolve(&self, item: &SyncQueueItem) -> NotFoundResolution {
        if item.action == SyncAction::Delete {
            return NotFoundResolution::AlreadyGone;
        }
        let strategy = self.per_kind.get(&item.entity_type).unwrap_or(&self.default);
        strategy(item)
    }
}

impl Default for NotFoundStrategies {
    fn default() -> Self {
        Self::new(fail_on_not_found()).with(EntityKind::DimensionAssessment, recreate_on_update())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub on_exhausted: OnExhaustedRetries,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            on_exhausted: OnExhaustedRetries::MarkFailed,
        }
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retry.max(1),
            on_exhausted: config.on_exhausted,
        }
    }
}

/// Result of pushing one queue item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pushed,
    /// CREATE acknowledged; the record now lives under `server_id`.
    Rekeyed { server_id: EntityId },
    AlreadyGone,
    Retrying { retries: u32, error: RemoteError },
    Parked { error: RemoteError },
    Dropped { error: RemoteError },
    /// Connectivity failure; the item was left untouched.
    Offline { error: RemoteError },
    /// The item vanished before it could be pushed.
    Skipped,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::Pushed | AttemptOutcome::Rekeyed { .. } | AttemptOutcome::AlreadyGone
        )
    }

    pub fn error(&self) -> Option<&RemoteError> {
        match self {
            AttemptOutcome::Retrying { error, .. }
            | AttemptOutcome::Parked { error }
            | AttemptOutcome::Dropped { error }
            | AttemptOutcome::Offline { error } => Some(error),
            _ => None,
        }
    }

    pub fn push_result(&self) -> Option<PushResult> {
        match self {
            AttemptOutcome::Pushed
            | AttemptOutcome::Rekeyed { .. }
            | AttemptOutcome::AlreadyGone => Some(PushResult::Pushed),
            AttemptOutcome::Retrying { .. } => Some(PushResult::Retrying),
            AttemptOutcome::Parked { .. } => Some(PushResult::Parked),
            AttemptOutcome::Dropped { .. } => Some(PushResult::Dropped),
            AttemptOutcome::Offline { .. } => Some(PushResult::Deferred),
            AttemptOutcome::Skipped => None,
        }
    }
}

/// Server id from a CREATE response: `id` at the top level or under `data`.
fn server_id_from(response: &Value) -> Option<EntityId> {
    let id = response
        .get("id")
        .or_else(|| response.get("data").and_then(|data| data.get("id")))?;
    let id = match id {
        Value::String(value) => value.clone(),
        Value::Number(value) => value.to_string(),
        _ => return None,
    };
    EntityId::new(id).ok()
}

/// Pushes single queue items and turns the answer into state changes.
pub struct SyncAttempt {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteApi>,
    ledger: SyncLedger,
    clock: Arc<dyn Clock>,
    strategies: NotFoundStrategies,
    policy: RetryPolicy,
}

impl SyncAttempt {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteApi>,
        ledger: SyncLedger,
        clock: Arc<dyn Clock>,
        strategies: NotFoundStrategies,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            remote,
            ledger,
            clock,
            strategies,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn push(&self, item: &SyncQueueItem) -> Result<AttemptOutcome, AppError> {
        let kind = item.entity_type;
        let id = item.entity_id.as_str();
        let body = item.payload.as_json();
        debug!(
            entity_type = %kind,
            entity_id = %id,
            action = %item.action,
            retries = item.retries,
            queue_id = %item.id,
            "pushing queue item"
        );

        let result = match item.action {
            SyncAction::Create => self.remote.create(kind, body).await.map(Some),
            SyncAction::Update => self.remote.update(kind, id, body).await.map(Some),
            SyncAction::Delete => self.remote.delete(kind, id).await.map(|_| None),
        };

        match result {
            Ok(response) => self.complete(item, response).await,
            Err(error @ RemoteError::Connectivity(_)) => {
                debug!(entity_type = %kind, entity_id = %id, %error, "remote unreachable");
                Ok(AttemptOutcome::Offline { error })
            }
            Err(error @ RemoteError::NotFound(_)) => self.resolve_not_found(item, error).await,
            Err(error) => self.fail(item, error).await,
        }
    }

    async fn complete(
        &self,
        item: &SyncQueueItem,
        response: Option<Value>,
    ) -> Result<AttemptOutcome, AppError> {
        let kind = item.entity_type;
        match item.action {
            SyncAction::Create => self.acknowledge_create(item, response.as_ref()).await,
            SyncAction::Update => {
                self.ledger
                    .confirm_update(kind, &item.entity_id, item.id)
                    .await?;
                Ok(AttemptOutcome::Pushed)
            }
            SyncAction::Delete => {
                self.ledger
                    .confirm_delete(kind, &item.entity_id, item.id)
                    .await?;
                Ok(AttemptOutcome::Pushed)
            }
        }
    }

    async fn acknowledge_create(
        &self,
        item: &SyncQueueItem,
        response: Option<&Value>,
    ) -> Result<AttemptOutcome, AppError> {
        let kind = item.entity_type;
        let server_id = response
            .and_then(server_id_from)
            .unwrap_or_else(|| item.entity_id.clone());

        let record = self
            .ledger
            .mark_as_synced(kind, &item.entity_id, &server_id, Some(item.id))
            .await?;

        if record.is_none() {
            // Deleted locally while the CREATE was in flight; remove the remote copy too.
            warn!(
                entity_type = %kind,
                entity_id = %server_id,
                "created record was deleted locally, queueing remote delete"
            );
            self.store
                .enqueue(NewSyncQueueItem::new(
                    kind,
                    server_id.clone(),
                    SyncAction::Delete,
                    OfflinePayload::id_only(server_id.as_str()),
                    self.clock.now(),
                ))
                .await?;
        }

        if server_id == item.entity_id {
            Ok(AttemptOutcome::Pushed)
        } else {
            Ok(AttemptOutcome::Rekeyed { server_id })
        }
    }

    async fn resolve_not_found(
        &self,
        item: &SyncQueueItem,
        error: RemoteError,
    ) -> Result<AttemptOutcome, AppError> {
        let kind = item.entity_type;
        match self.strategies.resolve(item) {
            NotFoundResolution::AlreadyGone => {
                info!(
                    entity_type = %kind,
                    entity_id = %item.entity_id,
                    action = %item.action,
                    "remote record already gone"
                );
                self.ledger
                    .confirm_delete(kind, &item.entity_id, item.id)
                    .await?;
                Ok(AttemptOutcome::AlreadyGone)
            }
            NotFoundResolution::RecreateAsCreate => {
                info!(
                    entity_type = %kind,
                    entity_id = %item.entity_id,
                    "remote record missing, re-creating"
                );
                match self.remote.create(kind, item.payload.as_json()).await {
                    Ok(response) => self.acknowledge_create(item, Some(&response)).await,
                    Err(error @ RemoteError::Connectivity(_)) => {
                        Ok(AttemptOutcome::Offline { error })
                    }
                    Err(error) => self.fail(item, error).await,
                }
            }
            NotFoundResolution::Fail => self.fail(item, error).await,
        }
    }

    async fn fail(
        &self,
        item: &SyncQueueItem,
        error: RemoteError,
    ) -> Result<AttemptOutcome, AppError> {
        let kind = item.entity_type;
        let message = error.to_string();
        let retries = self.store.record_item_failure(item.id, &message).await?;

        if retries < self.policy.max_retries {
            warn!(
                entity_type = %kind,
                entity_id = %item.entity_id,
                action = %item.action,
                retries,
                error = %message,
                "push failed, will retry"
            );
            self.ledger
                .note_retry(kind, &item.entity_id, retries, &message)
                .await?;
            return Ok(AttemptOutcome::Retrying { retries, error });
        }

        match self.policy.on_exhausted {
            OnExhaustedRetries::MarkFailed => {
                self.store.park_item(item.id).await?;
                self.ledger
                    .mark_as_failed(kind, &item.entity_id, &message, Some(retries))
                    .await?;
                Ok(AttemptOutcome::Parked { error })
            }
            OnExhaustedRetries::Drop => {
                // Later items of a never-created record cannot succeed without it.
                if item.action == SyncAction::Create {
                    self.store.remove_items_for(kind, &item.entity_id).await?;
                } else {
                    self.store.remove_item(item.id).await?;
                }
                self.ledger
                    .mark_as_failed(kind, &item.entity_id, &message, Some(retries))
                    .await?;
                Ok(AttemptOutcome::Dropped { error })
            }
        }
    }
}
