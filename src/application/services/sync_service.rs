use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::reconciliation::Reconciler;
use super::sync_attempt::{AttemptOutcome, SyncAttempt};
use super::sync_queue::SyncQueue;
use crate::application::ports::{CollectionScope, LocalStore, RecordFilter};
use crate::domain::entities::{
    Assessment, Cooperation, CooperationUser, DigitalisationGap, DigitalisationLevel, Dimension,
    DimensionAssessment, OfflineRecord, Recommendation,
};
use crate::domain::value_objects::{EntityId, EntityKind, SyncStatus};
use crate::infrastructure::offline::SyncMetrics;
use crate::shared::error::AppError;

/// One step of a sync run. The coordinator runs its services in order.
#[async_trait]
pub trait SyncService: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self) -> Result<ServiceReport, AppError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceReport {
    pub pushed: u32,
    pub retrying: u32,
    pub parked: u32,
    pub dropped: u32,
    pub deferred: u32,
    pub pulled: u32,
    pub removed: u32,
    pub skipped: u32,
}

impl ServiceReport {
    pub fn merge(&mut self, other: &ServiceReport) {
        self.pushed += other.pushed;
        self.retrying += other.retrying;
        self.parked += other.parked;
        self.dropped += other.dropped;
        self.deferred += other.deferred;
        self.pulled += other.pulled;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }

    pub fn failed(&self) -> u32 {
        self.retrying + self.parked + self.dropped
    }
}

/// Pushes queued mutations oldest-first.
pub struct QueueDrainService {
    queue: SyncQueue,
    attempt: Arc<SyncAttempt>,
    metrics: Arc<SyncMetrics>,
    batch_size: u32,
}

impl QueueDrainService {
    pub fn new(
        queue: SyncQueue,
        attempt: Arc<SyncAttempt>,
        metrics: Arc<SyncMetrics>,
        batch_size: u32,
    ) -> Self {
        Self {
            queue,
            attempt,
            metrics,
            batch_size: batch_size.max(1),
        }
    }

    fn record(&self, outcome: &AttemptOutcome) {
        if let Some(result) = outcome.push_result() {
            self.metrics.record_push(result);
        }
    }

    /// One drain pass. Once an item of an entity fails, the entity's later items wait for
    /// the next pass; a connectivity failure ends the pass.
    pub async fn drain(&self) -> Result<ServiceReport, AppError> {
        let mut report = ServiceReport::default();
        let mut blocked: HashSet<(EntityKind, EntityId)> = HashSet::new();

        'passes: loop {
            let batch = self.queue.pending(self.batch_size).await?;
            let full_batch = batch.len() as u32 >= self.batch_size;
            let mut progressed = false;

            for queued in batch {
                // An earlier CREATE in this pass may have re-pointed or removed the item.
                let Some(item) = self.queue.item(queued.id).await? else {
                    continue;
                };
                if item.parked {
                    continue;
                }
                let key = item.entity_key();
                if blocked.contains(&key) {
                    debug!(
                        entity_type = %item.entity_type,
                        entity_id = %item.entity_id,
                        queue_id = %item.id,
                        "entity blocked for this pass"
                    );
                    continue;
                }

                let outcome = self.attempt.push(&item).await?;
                self.record(&outcome);
                match outcome {
                    AttemptOutcome::Pushed
                    | AttemptOutcome::Rekeyed { .. }
                    | AttemptOutcome::AlreadyGone => {
                        report.pushed += 1;
                        progressed = true;
                    }
                    AttemptOutcome::Retrying { .. } => {
                        report.retrying += 1;
                        blocked.insert(key);
                    }
                    AttemptOutcome::Parked { .. } => {
                        report.parked += 1;
                        blocked.insert(key);
                    }
                    AttemptOutcome::Dropped { .. } => {
                        report.dropped += 1;
                        blocked.insert(key);
                    }
                    AttemptOutcome::Offline { error } => {
                        info!(%error, "remote unreachable, stopping queue drain");
                        report.deferred += 1;
                        break 'passes;
                    }
                    AttemptOutcome::Skipped => {}
                }
            }

            if !full_batch || !progressed {
                break;
            }
        }

        if report.pushed + report.failed() > 0 {
            info!(
                pushed = report.pushed,
                retrying = report.retrying,
                parked = report.parked,
                dropped = report.dropped,
                "queue drain finished"
            );
        }
        Ok(report)
    }

    /// Foreground push of every queued item of one entity, parked ones included. The
    /// first failure is returned to the caller.
    pub async fn push_entity(&self, kind: EntityKind, id: &EntityId) -> Result<(), AppError> {
        self.queue.reactivate(kind, id).await?;
        let items = self.queue.items_for(kind, id).await?;

        for queued in items {
            let Some(item) = self.queue.item(queued.id).await? else {
                continue;
            };
            let outcome = self.attempt.push(&item).await?;
            self.record(&outcome);
            if let Some(error) = outcome.error() {
                return Err(error.clone().into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SyncService for QueueDrainService {
    fn name(&self) -> &str {
        "queue_drain"
    }

    async fn run(&self) -> Result<ServiceReport, AppError> {
        self.drain().await
    }
}

/// Where a pull service gets its collection scopes from.
#[async_trait]
pub trait ScopeSource: Send + Sync {
    async fn scopes(&self) -> Result<Vec<CollectionScope>, AppError>;
}

pub struct FixedScopes(Vec<CollectionScope>);

impl FixedScopes {
    pub fn new(scopes: Vec<CollectionScope>) -> Self {
        Self(scopes)
    }

    /// `organization_id = X` when an organization is configured, else the whole collection.
    pub fn organization(organization_id: Option<&str>) -> Self {
        match organization_id {
            Some(id) => Self(vec![CollectionScope::by("organization_id", id)]),
            None => Self(vec![CollectionScope::all()]),
        }
    }
}

#[async_trait]
impl ScopeSource for FixedScopes {
    async fn scopes(&self) -> Result<Vec<CollectionScope>, AppError> {
        Ok(self.0.clone())
    }
}

/// One scope per locally known parent record, e.g. cooperation users per cooperation.
pub struct LocalParentScopes {
    store: Arc<dyn LocalStore>,
    parent: EntityKind,
    column: &'static str,
}

impl LocalParentScopes {
    pub fn new(store: Arc<dyn LocalStore>, parent: EntityKind, column: &'static str) -> Self {
        Self {
            store,
            parent,
            column,
        }
    }
}

#[async_trait]
impl ScopeSource for LocalParentScopes {
    async fn scopes(&self) -> Result<Vec<CollectionScope>, AppError> {
        // Parents the server has never seen cannot have remote children.
        let filter = RecordFilter::new().with_statuses(&[SyncStatus::Synced, SyncStatus::Pending]);
        let parents = self.store.query(self.parent, &filter).await?;
        Ok(parents
            .into_iter()
            .map(|parent| CollectionScope::by(self.column, parent.id.as_str()))
            .collect())
    }
}

/// Reconciles one entity kind over every scope its source yields.
pub struct PullService<E: OfflineRecord> {
    name: String,
    reconciler: Arc<Reconciler>,
    scopes: Arc<dyn ScopeSource>,
    metrics: Arc<SyncMetrics>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: OfflineRecord> PullService<E> {
    pub fn new(
        reconciler: Arc<Reconciler>,
        scopes: Arc<dyn ScopeSource>,
        metrics: Arc<SyncMetrics>,
    ) -> Self {
        Self {
            name: format!("{}_pull", E::KIND),
            reconciler,
            scopes,
            metrics,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: OfflineRecord> SyncService for PullService<E> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<ServiceReport, AppError> {
        let mut report = ServiceReport::default();
        let mut first_error = None;

        for scope in self.scopes.scopes().await? {
            match self.reconciler.reconcile::<E>(&scope).await {
                Ok(outcome) => {
                    self.metrics.record_pull(true);
                    report.pulled += outcome.upserted.len() as u32;
                    report.removed += outcome.removed.len() as u32;
                    report.skipped += outcome.skipped.len() as u32;
                }
                Err(err) => {
                    self.metrics.record_pull(false);
                    warn!(
                        service = %self.name,
                        scope = ?scope.params(),
                        error = %err,
                        "pull failed for scope"
                    );
                    if err.is_connectivity() {
                        return Err(err);
                    }
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }
}

fn pull<E: OfflineRecord>(
    reconciler: &Arc<Reconciler>,
    scopes: Arc<dyn ScopeSource>,
    metrics: &Arc<SyncMetrics>,
) -> Arc<dyn SyncService> {
    Arc::new(PullService::<E>::new(
        Arc::clone(reconciler),
        scopes,
        Arc::clone(metrics),
    ))
}

/// Default run order: push first, then parents before the children scoped by them.
pub fn standard_services(
    drain: Arc<QueueDrainService>,
    reconciler: Arc<Reconciler>,
    store: Arc<dyn LocalStore>,
    metrics: Arc<SyncMetrics>,
    organization_id: Option<&str>,
) -> Vec<Arc<dyn SyncService>> {
    let organization: Arc<dyn ScopeSource> = Arc::new(FixedScopes::organization(organization_id));
    let per_parent = |parent: EntityKind, column: &'static str| -> Arc<dyn ScopeSource> {
        Arc::new(LocalParentScopes::new(Arc::clone(&store), parent, column))
    };

    vec![
        drain as Arc<dyn SyncService>,
        pull::<Cooperation>(&reconciler, organization.clone(), &metrics),
        pull::<Dimension>(&reconciler, organization.clone(), &metrics),
        pull::<CooperationUser>(
            &reconciler,
            per_parent(EntityKind::Cooperation, "cooperation_id"),
            &metrics,
        ),
        pull::<Assessment>(&reconciler, organization, &metrics),
        pull::<Recommendation>(
            &reconciler,
            per_parent(EntityKind::Dimension, "dimension_id"),
            &metrics,
        ),
        pull::<DigitalisationGap>(
            &reconciler,
            per_parent(EntityKind::Assessment, "assessment_id"),
            &metrics,
        ),
        pull::<DigitalisationLevel>(
            &reconciler,
            per_parent(EntityKind::Dimension, "dimension_id"),
            &metrics,
        ),
        pull::<DimensionAssessment>(
            &reconciler,
            per_parent(EntityKind::Assessment, "assessment_id"),
            &metrics,
        ),
    ]
}
