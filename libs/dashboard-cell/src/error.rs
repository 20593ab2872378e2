use thiserror::Error;

use shared_backend::BackendError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Backend(BackendError::Auth(msg)) => AppError::Auth(msg),
            DashboardError::Backend(BackendError::NotFound(msg)) => AppError::NotFound(msg),
            DashboardError::Backend(BackendError::NotConfigured) => {
                AppError::Internal(BackendError::NotConfigured.to_string())
            }
            DashboardError::Backend(other) => AppError::ExternalService(other.to_string()),
            DashboardError::Validation(msg) => AppError::ValidationError(msg),
            DashboardError::Conflict(msg) => AppError::Conflict(msg),
        }
    }
}
