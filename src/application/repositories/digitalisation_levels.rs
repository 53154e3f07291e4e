use super::offline_repository::OfflineRepository;
use crate::application::ports::{CollectionScope, RecordFilter};
use crate::domain::entities::DigitalisationLevel;
use crate::shared::error::AppError;

pub type DigitalisationLevelRepository = OfflineRepository<DigitalisationLevel>;

impl OfflineRepository<DigitalisationLevel> {
    pub async fn list_for_dimension(
        &self,
        dimension_id: &str,
    ) -> Result<Vec<DigitalisationLevel>, AppError> {
        self.get_all(&CollectionScope::by("dimension_id", dimension_id))
            .await
    }

    /// Lookup on the `(dimension_id, level_type, state)` index.
    pub async fn find_levels(
        &self,
        dimension_id: &str,
        level_type: &str,
        state: &str,
    ) -> Result<Vec<DigitalisationLevel>, AppError> {
        self.query_local(
            &RecordFilter::new()
                .eq("dimension_id", dimension_id)
                .eq("level_type", level_type)
                .eq("state", state)
                .visible_only(),
        )
        .await
    }
}
