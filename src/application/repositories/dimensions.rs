use super::offline_repository::OfflineRepository;
use crate::application::ports::CollectionScope;
use crate::domain::entities::Dimension;
use crate::shared::error::AppError;

pub type DimensionRepository = OfflineRepository<Dimension>;

impl OfflineRepository<Dimension> {
    /// Dimensions assigned to an organization, in display order.
    pub async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<Dimension>, AppError> {
        let mut dimensions = self
            .get_all(&CollectionScope::by("organization_id", organization_id))
            .await?;
        dimensions.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(dimensions)
    }
}
