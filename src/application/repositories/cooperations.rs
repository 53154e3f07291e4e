use super::offline_repository::OfflineRepository;
use crate::application::ports::CollectionScope;
use crate::domain::entities::Cooperation;
use crate::shared::error::AppError;

pub type CooperationRepository = OfflineRepository<Cooperation>;

impl OfflineRepository<Cooperation> {
    pub async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Cooperation>, AppError> {
        self.get_all(&CollectionScope::by("organization_id", organization_id))
            .await
    }
}
