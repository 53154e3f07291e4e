use super::offline_repository::OfflineRepository;
use crate::application::ports::CollectionScope;
use crate::domain::entities::CooperationUser;
use crate::shared::error::AppError;

pub type CooperationUserRepository = OfflineRepository<CooperationUser>;

impl OfflineRepository<CooperationUser> {
    pub async fn list_for_cooperation(
        &self,
        cooperation_id: &str,
    ) -> Result<Vec<CooperationUser>, AppError> {
        self.get_all(&CollectionScope::by("cooperation_id", cooperation_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::repositories::test_support::offline_context;
    use crate::domain::entities::ChangeKind;
    use crate::domain::value_objects::EntityKind;

    #[tokio::test]
    async fn deleting_an_unsynced_member_leaves_nothing_behind() {
        let fx = offline_context().await;
        let repo = CooperationUserRepository::new(fx.ctx.clone());
        let mut changes = fx.bus.subscribe();

        let member = repo
            .add(CooperationUser::new("coop-1", "user-1", "viewer"))
            .await
            .unwrap();
        assert!(repo.delete(&member.id).await.unwrap());

        assert!(repo.list_for_cooperation("coop-1").await.unwrap().is_empty());
        assert!(repo.get_local(&member.id).await.unwrap().is_none());
        assert_eq!(fx.ctx.queue.len().await.unwrap(), 0);

        let added = changes.recv().await.unwrap();
        assert_eq!(added.kind, EntityKind::CooperationUser);
        assert_eq!(added.change, ChangeKind::Upserted);
        let removed = changes.recv().await.unwrap();
        assert_eq!(removed.change, ChangeKind::Removed);
        assert_eq!(removed.entity_id, member.id);
    }
}
