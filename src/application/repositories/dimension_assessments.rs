use serde_json::Value;

use super::offline_repository::OfflineRepository;
use crate::application::ports::{CollectionScope, RecordFilter};
use crate::domain::entities::DimensionAssessment;
use crate::shared::error::AppError;

pub type DimensionAssessmentRepository = OfflineRepository<DimensionAssessment>;

impl OfflineRepository<DimensionAssessment> {
    pub async fn list_for_assessment(
        &self,
        assessment_id: &str,
    ) -> Result<Vec<DimensionAssessment>, AppError> {
        self.get_all(&CollectionScope::by("assessment_id", assessment_id))
            .await
    }

    /// The record for a `(dimension_id, assessment_id)` pair, if any.
    pub async fn find_by_pair(
        &self,
        dimension_id: &str,
        assessment_id: &str,
    ) -> Result<Option<DimensionAssessment>, AppError> {
        let mut found = self
            .query_local(
                &RecordFilter::new()
                    .eq("dimension_id", dimension_id)
                    .eq("assessment_id", assessment_id)
                    .visible_only(),
            )
            .await?;
        Ok(found.pop())
    }

    /// Applies `changes` to the pair's record, creating it first when missing.
    pub async fn upsert_for_pair(
        &self,
        dimension_id: &str,
        assessment_id: &str,
        changes: Value,
    ) -> Result<DimensionAssessment, AppError> {
        let existing = match self.find_by_pair(dimension_id, assessment_id).await? {
            Some(existing) => existing,
            None => {
                self.add(DimensionAssessment::new(dimension_id, assessment_id))
                    .await?
            }
        };
        let id = existing.id.clone();
        Ok(self.update(&id, changes).await?.unwrap_or(existing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repositories::test_support::offline_context;
    use serde_json::json;

    #[tokio::test]
    async fn pair_upsert_reuses_the_existing_record() {
        let fx = offline_context().await;
        let repo = DimensionAssessmentRepository::new(fx.ctx.clone());

        let first = repo
            .upsert_for_pair("dim-1", "asm-1", json!({"current_level": 2}))
            .await
            .unwrap();
        let second = repo
            .upsert_for_pair("dim-1", "asm-1", json!({"target_level": 4}))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.current_level, Some(2));
        assert_eq!(second.target_level, Some(4));
        assert_eq!(repo.list_for_assessment("asm-1").await.unwrap().len(), 1);
        assert!(repo.find_by_pair("dim-2", "asm-1").await.unwrap().is_none());
    }
}
