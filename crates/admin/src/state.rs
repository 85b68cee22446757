//! Application state shared across handlers.

use std::sync::Arc;

use bearing_shop_supabase::{AuthClient, AuthError, StorageClient, StorageError};
use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::{EmailError, EmailService};

/// Error building the shared clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("supabase auth client: {0}")]
    Auth(#[from] AuthError),
    #[error("supabase storage client: {0}")]
    Storage(#[from] StorageError),
    #[error("email: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    auth: AuthClient,
    storage: StorageClient,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the API clients cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        let auth = AuthClient::new(&config.supabase.url, config.supabase.anon_key.clone())?;
        let storage = StorageClient::new(
            &config.supabase.url,
            config.supabase.service_role_key.clone(),
            config.supabase.bucket.clone(),
        )?;
        let email = match &config.email {
            Some(email_config) => Some(EmailService::new(email_config)?),
            None => {
                tracing::warn!("SMTP_HOST not set, status-update emails disabled");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                storage,
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Supabase Auth client (anon key), for staff sign-in.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Storage client for the public image bucket (service role key).
    #[must_use]
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}
