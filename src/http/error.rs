// ABOUTME: HTTP error type mapping gateway failures to status codes.
// ABOUTME: Renders a JSON {"message": ...} body like the Docker Engine API.

use crate::registry::ConfigNotFound;
use crate::repository::RepositoryError;
use crate::runtime::DaemonError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    ConfigNotFound(#[from] ConfigNotFound),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigNotFound(_) => StatusCode::NOT_FOUND,
            Self::Daemon(DaemonError::InvalidRequest(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Daemon(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Repository(RepositoryError::ReadOnly(_)) => StatusCode::CONFLICT,
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "message": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Status for a command that only reports success.
pub fn command_status(succeeded: bool) -> StatusCode {
    if succeeded {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
