use super::offline_repository::OfflineRepository;
use crate::application::ports::{CollectionScope, RecordFilter};
use crate::domain::entities::DigitalisationGap;
use crate::shared::error::AppError;

pub type DigitalisationGapRepository = OfflineRepository<DigitalisationGap>;

impl OfflineRepository<DigitalisationGap> {
    pub async fn list_for_assessment(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<DigitalisationGap>, AppError> {
        self.get_all(&CollectionScope::by("assessment_id", assessment_id))
            .await
    }

    pub async fn find_for_dimension(
        &self,
        assessment_id: &str,
        dimension_id: &str,
    ) -> Result<Vec<DigitalisationGap>, AppError> {
        self.query_local(
            &RecordFilter::new()
                .eq("assessment_id", assessment_id)
                .eq("dimension_id", dimension_id)
                .visible_only(),
        )
        .await
    }
}
