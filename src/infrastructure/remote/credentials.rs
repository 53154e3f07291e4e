use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::CredentialProvider;
use crate::shared::error::AppError;

/// Token handed over by the host's identity layer; replaced on refresh or logout.
#[derive(Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Result<Option<String>, AppError> {
        Ok(self.token.read().await.clone())
    }
}
