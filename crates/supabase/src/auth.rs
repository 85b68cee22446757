//! Supabase Auth (GoTrue) client.
//!
//! Only the password flows are used: the storefront signs customers in and
//! up, the admin panel signs staff in. Sessions are not persisted here; the
//! caller stores what it needs in its own session.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{error_message, http_client, trim_base};

/// Errors returned by [`AuthClient`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Supabase rejected the request (bad credentials, duplicate user, ...).
    /// The message is safe to show to the user.
    #[error("{0}")]
    Rejected(String),

    /// Supabase returned a server error.
    #[error("auth service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The authenticated user as reported by Supabase.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens and user returned by a successful sign-in.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of a sign-up.
///
/// With email confirmation enabled Supabase returns only the user; otherwise
/// it signs the user in immediately.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired(AuthUser),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

/// Client for the `/auth/v1` endpoints, authenticated with the anon key.
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl AuthClient {
    /// Create a client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString) -> Result<Self, AuthError> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
            anon_key,
        })
    }

    /// Sign in with email and password (`grant_type=password`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] for invalid credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let payload = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<AuthSession>().await?)
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] when Supabase refuses the sign-up,
    /// e.g. for an existing email or a weak password.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = format!("{}/auth/v1/signup", self.base_url);
        let payload = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(session) => SignUpOutcome::SignedIn(session),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user),
        })
    }

    /// Revoke the refresh tokens of the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    if status.is_client_error() {
        tracing::info!(status = status.as_u16(), %message, "Supabase auth rejected request");
        Err(AuthError::Rejected(message))
    } else {
        tracing::error!(status = status.as_u16(), %message, "Supabase auth service error");
        Err(AuthError::Service {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_ID: &str = "6f1c7a52-3c1b-4f7a-9a52-0d5c3b1f2e10";

    fn client(server: &MockServer) -> AuthClient {
        AuthClient::new(&server.uri(), SecretString::from("anon-key".to_owned())).unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_with_password() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({"email": "buyer@example.com", "password": "hunter22"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "refresh",
                "user": {"id": USER_ID, "email": "buyer@example.com", "role": "authenticated"}
            })))
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_in_with_password("buyer@example.com", &SecretString::from("hunter22".to_owned()))
            .await
            .unwrap();

        assert_eq!(session.access_token, "access");
        assert_eq!(session.user.id.to_string(), USER_ID);
        assert_eq!(session.user.email.as_deref(), Some("buyer@example.com"));
        assert!(!format!("{session:?}").contains("access\""));
    }

    #[tokio::test]
    async fn test_sign_in_bad_credentials_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in_with_password("buyer@example.com", &SecretString::from("wrong".to_owned()))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_sign_up_requiring_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": USER_ID,
                "email": "new@example.com",
                "confirmation_sent_at": "2026-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .sign_up("new@example.com", &SecretString::from("long-password".to_owned()))
            .await
            .unwrap();

        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired(u) if u.id.to_string() == USER_ID));
    }

    #[tokio::test]
    async fn test_sign_up_auto_confirmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access",
                "refresh_token": "refresh",
                "user": {"id": USER_ID, "email": "new@example.com"}
            })))
            .mount(&server)
            .await;

        let outcome = client(&server)
            .sign_up("new@example.com", &SecretString::from("long-password".to_owned()))
            .await
            .unwrap();

        assert!(matches!(outcome, SignUpOutcome::SignedIn(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_not_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server).sign_out("token").await.unwrap_err();
        assert!(matches!(err, AuthError::Service { status: 503, .. }));
    }
}
