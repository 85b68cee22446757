//! Handler error type and Sentry helpers.
//!
//! Handlers return [`Result`]. Server-side failures are reported to Sentry
//! and logged with the event ID; the client only sees a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bearing_shop_supabase::AuthError;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::stripe::StripeError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Supabase Auth failure; `Rejected` means bad credentials or input.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthError::Rejected(_)) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Stripe(_) | Self::Auth(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Text sent to the browser; upstream and database details stay in logs.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Stripe(_) => "Payment service error".to_owned(),
            Self::Auth(AuthError::Rejected(msg)) => msg.clone(),
            Self::Auth(_) => "Authentication service error".to_owned(),
            Self::NotFound(_) | Self::Unauthorized(_) | Self::BadRequest(_) => self.to_string(),
        }
    }

    fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Repository(e) => Self::Database(e),
            CheckoutError::Stripe(e) => Self::Stripe(e),
            CheckoutError::InvalidAmount => Self::Internal(err.to_string()),
            CheckoutError::EmptyCart | CheckoutError::MissingAddress(_) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request error");
        }
        (self.status(), self.public_message()).into_response()
    }
}

/// Attach the signed-in customer to later Sentry events.
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

/// Record a customer action as an info breadcrumb with string data.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data: data
            .iter()
            .map(|(k, v)| ((*k).to_owned(), serde_json::Value::from(*v)))
            .collect(),
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = AppError::NotFound("product 6205-2RS".to_owned());
        assert_eq!(err.public_message(), "Not found: product 6205-2RS");
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("pool timed out".to_owned());
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejected_login_is_unauthorized_not_bad_gateway() {
        let rejected = AppError::Auth(AuthError::Rejected("Invalid login credentials".to_owned()));
        assert!(!rejected.is_server_error());
        assert_eq!(rejected.public_message(), "Invalid login credentials");
        assert_eq!(status_of(rejected), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_checkout_input_errors_are_bad_requests() {
        assert_eq!(status_of(CheckoutError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CheckoutError::MissingAddress(vec!["city", "postal_code"])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::InvalidAmount),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
