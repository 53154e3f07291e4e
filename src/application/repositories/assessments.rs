use chrono::{DateTime, Utc};
use serde_json::json;

use super::offline_repository::OfflineRepository;
use crate::application::ports::CollectionScope;
use crate::domain::entities::assessment::ASSESSMENT_COMPLETED;
use crate::domain::entities::Assessment;
use crate::shared::error::AppError;

pub type AssessmentRepository = OfflineRepository<Assessment>;

impl OfflineRepository<Assessment> {
    pub async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Assessment>, AppError> {
        self.get_all(&CollectionScope::by("organization_id", organization_id))
            .await
    }

    pub async fn complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Assessment>, AppError> {
        self.update(
            id,
            json!({ "status": ASSESSMENT_COMPLETED, "completed_at": completed_at }),
        )
        .await
    }
}
