use async_trait::async_trait;

use crate::shared::error::AppError;

/// Supplies the bearer token attached to every remote call.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<Option<String>, AppError>;
}
