use thiserror::Error;

use crate::application::ports::remote_api::RemoteError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Remote record not found: {0}")]
    RemoteNotFound(String),

    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Local integrity error: {0}")]
    LocalIntegrity(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors caused by the device being offline rather than by the request itself.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, AppError::Connectivity(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Migration(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Connectivity(msg) => AppError::Connectivity(msg),
            RemoteError::NotFound(msg) => AppError::RemoteNotFound(msg),
            RemoteError::Status { status, message } => AppError::Remote { status, message },
            RemoteError::Unauthorized(message) => AppError::Remote {
                status: 401,
                message,
            },
            RemoteError::Decode(msg) => AppError::Serialization(msg),
            RemoteError::Transport(message) => AppError::Remote { status: 0, message },
        }
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
