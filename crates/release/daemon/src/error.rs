//! Error types for the release daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use release_types::{ErrorKind, ReleaseError};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fixture loading error
    #[error("Fixture error: {0:#}")]
    Fixtures(#[from] anyhow::Error),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// A workflow operation was refused
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The request could not be read
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Release(e) => e.kind(),
            ApiError::BadRequest(_) => ErrorKind::Validation,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::InvalidTemplate => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RoleMismatch => StatusCode::FORBIDDEN,
            ErrorKind::BatchNotReleasable
            | ErrorKind::DuplicateActiveRelease
            | ErrorKind::OutOfOrder
            | ErrorKind::AlreadyDecided
            | ErrorKind::ReleaseClosed
            | ErrorKind::OnHold
            | ErrorKind::NotApproved => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Error body inside the failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub kind: ErrorKind,
}

/// `{ "success": false, "error": { ... } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(code = kind.code(), error = %self, "Request refused");
        }

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: kind.code().to_string(),
                message: self.to_string(),
                kind,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use release_types::{ReleaseId, ReleaseStatus, UserId};

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::from(ReleaseError::ReleaseNotFound(ReleaseId(1)))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ReleaseError::NotApproved {
                release: ReleaseId(1),
                status: ReleaseStatus::InProgress,
            })
            .into_response()
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::BadRequest("missing field".into())
                .into_response()
                .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ReleaseError::UserNotFound(UserId(9))).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_only_unavailable_is_a_server_error() {
        assert_eq!(
            ApiError::from(ReleaseError::Unavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(!ApiError::from(ReleaseError::OnHold(ReleaseId(2)))
            .status()
            .is_server_error());
    }
}
