//! Thin REST clients for the Supabase services Bearing Shop depends on.
//!
//! - [`auth`] - password sign-in, sign-up and sign-out against `/auth/v1`
//! - [`storage`] - object upload, removal and public URLs under `/storage/v1`
//!
//! Both clients take the project base URL explicitly so tests can point them
//! at a mock server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod storage;

pub use auth::{AuthClient, AuthError, AuthSession, AuthUser, SignUpOutcome};
pub use storage::{StorageClient, StorageError, unique_object_path};

use std::time::Duration;

/// Timeout applied to every Supabase request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Normalize a project URL so paths can be appended with a single `/`.
fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}

/// Pull a human-readable message out of a Supabase error body.
///
/// GoTrue and Storage use several shapes (`error_description`, `msg`,
/// `message`, `error`); fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_owned))
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            error_message(r#"{"code":422,"msg":"User already registered"}"#),
            "User already registered"
        );
        assert_eq!(
            error_message(r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#),
            "Object not found"
        );
        assert_eq!(error_message(" gateway timeout "), "gateway timeout");
    }

    #[test]
    fn test_trim_base() {
        assert_eq!(trim_base("https://x.supabase.co/"), "https://x.supabase.co");
    }
}
