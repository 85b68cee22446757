//! Handler error type for the admin panel.
//!
//! Any error that maps to a 5xx is captured to Sentry; its details stay in
//! the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bearing_shop_supabase::{AuthError, StorageError};
use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Image storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signed in, but the role does not allow the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(format!("invalid upload: {}", err.body_text()))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(StorageError::InvalidPath(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth(AuthError::Rejected(_)) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Storage(_) | Self::Auth(_) => StatusCode::BAD_GATEWAY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(msg)) | Self::Auth(AuthError::Rejected(msg)) => {
                msg.clone()
            }
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Storage(_) => "Image storage error".to_owned(),
            Self::Auth(_) => "Authentication service error".to_owned(),
            Self::NotFound(_) | Self::Unauthorized(_) | Self::Forbidden(_) | Self::BadRequest(_) => {
                self.to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request error");
        }
        (status, self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Tag later Sentry events with the signed-in staff member.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(str::to_owned),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_viewer_edit_is_forbidden() {
        let err = AppError::Forbidden("viewers cannot edit".to_owned());
        assert_eq!(err.public_message(), "Forbidden: viewers cannot edit");
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_repository_errors() {
        assert_eq!(status_of(RepositoryError::NotFound), StatusCode::NOT_FOUND);

        let conflict = AppError::from(RepositoryError::Conflict(
            "part number 6205-2RS already exists".to_owned(),
        ));
        assert_eq!(
            conflict.public_message(),
            "part number 6205-2RS already exists"
        );
        assert_eq!(status_of(conflict), StatusCode::CONFLICT);

        let corrupt = AppError::from(RepositoryError::DataCorruption("bad row".to_owned()));
        assert_eq!(corrupt.public_message(), "Internal server error");
        assert_eq!(status_of(corrupt), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_storage_errors() {
        assert_eq!(
            status_of(StorageError::InvalidPath("../x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StorageError::Api {
                status: 500,
                message: "down".to_owned()
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
