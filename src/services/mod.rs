pub mod daily_plan;
pub mod engagement;
pub mod mastery;
pub mod review;
pub mod topics;

use thiserror::Error;

use crate::response::AppError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => AppError::validation(message),
            ServiceError::NotFound(message) => AppError::not_found(message),
            ServiceError::Forbidden(message) => AppError::forbidden(message),
            ServiceError::Sql(err) => {
                tracing::error!(error = %err, "storage operation failed");
                AppError::db_error("storage temporarily unavailable, please retry")
            }
        }
    }
}
