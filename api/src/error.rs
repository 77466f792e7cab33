//! API errors and their envelope rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use pokedex_core::{envelope::ErrorEnvelope, DataSourceError, ValidationError};
use pokedex_databases::StoreError;

/// Message returned for failures that were not classified
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// Every failure a handler can return
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The data source failed for a reason other than not-found
    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: DataSourceError,
    },

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    RateLimited(String),

    /// Anything not classified above; details are logged, never returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a data source failure: not-found becomes [`AppError::NotFound`]
    /// with the given message, anything else an upstream failure
    pub fn from_data_source(
        err: DataSourceError,
        not_found_message: &str,
        failure_message: &str,
    ) -> Self {
        if err.is_not_found() {
            AppError::NotFound(not_found_message.to_string())
        } else {
            AppError::Upstream {
                message: failure_message.to_string(),
                source: err,
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Upstream { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => {
                AppError::Conflict("This Pokemon is already in favorites".to_string())
            }
            StoreError::NotFound(_) => {
                AppError::NotFound("No favorite found with that Pokemon ID".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            AppError::Internal(detail) => {
                error!("Unhandled error: {detail}");
                GENERIC_ERROR_MESSAGE.to_string()
            }
            AppError::Upstream { message, source } => {
                warn!("{message}: {source}");
                message.clone()
            }
            other => other.to_string(),
        };

        let body = ErrorEnvelope::for_status(status.as_u16(), message);
        (status, Json(body)).into_response()
    }
}
