//! Application state shared across handlers.

use std::sync::Arc;

use bearing_shop_supabase::{AuthClient, AuthError};
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::{EmailError, EmailService, HomeCache, NotificationFeed};
use crate::stripe::{StripeClient, StripeError};

/// Error building the shared clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("supabase auth client: {0}")]
    Auth(#[from] AuthError),
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("email: {0}")]
    Email(#[from] EmailError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    auth: AuthClient,
    stripe: StripeClient,
    email: Option<EmailService>,
    home: HomeCache,
    feed: NotificationFeed,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the API clients cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let auth = AuthClient::new(&config.supabase.url, config.supabase.anon_key.clone())?;
        let stripe = StripeClient::new(&config.stripe)?;
        let email = match &config.email {
            Some(email_config) => Some(EmailService::new(email_config)?),
            None => {
                tracing::warn!("SMTP_HOST not set, transactional email disabled");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                stripe,
                email,
                home: HomeCache::new(),
                feed: NotificationFeed::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Supabase Auth client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the Stripe client.
    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    /// Live notification fan-out; its listener is started by the binary.
    #[must_use]
    pub fn notifications(&self) -> &NotificationFeed {
        &self.inner.feed
    }

    /// Get the home page cache.
    #[must_use]
    pub fn home_cache(&self) -> &HomeCache {
        &self.inner.home
    }
}
