use super::offline_repository::OfflineRepository;
use crate::application::ports::{CollectionScope, RecordFilter};
use crate::domain::entities::Recommendation;
use crate::domain::value_objects::SyncStatus;
use crate::shared::error::AppError;

pub type RecommendationRepository = OfflineRepository<Recommendation>;

/// Recommendations that still have local work pending.
const OPEN_STATUSES: &[SyncStatus] = &[SyncStatus::New, SyncStatus::Pending, SyncStatus::Failed];

impl OfflineRepository<Recommendation> {
    pub async fn list_for_dimension(
        &self,
        dimension_id: &str,
    ) -> Result<Vec<Recommendation>, AppError> {
        self.get_all(&CollectionScope::by("dimension_id", dimension_id))
            .await
    }

    /// Local records in the given statuses, highest priority (lowest number) first.
    pub async fn by_priority(
        &self,
        statuses: &[SyncStatus],
    ) -> Result<Vec<Recommendation>, AppError> {
        self.query_local(
            &RecordFilter::new()
                .with_statuses(statuses)
                .order_by("priority"),
        )
        .await
    }

    pub async fn open_by_priority(&self) -> Result<Vec<Recommendation>, AppError> {
        self.by_priority(OPEN_STATUSES).await
    }
}
