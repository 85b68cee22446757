//! Customer sessions, stored in Postgres (`tower_sessions.session`).
//!
//! The session holds the signed-in customer, the cart and the page to
//! return to after login.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

pub const SESSION_COOKIE_NAME: &str = "bs_session";

/// Idle time before a session (and its guest cart) is dropped.
const IDLE_TIMEOUT: Duration = Duration::days(7);

fn serves_https(base_url: &str) -> bool {
    base_url.starts_with("https://")
}

#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_TIMEOUT))
        .with_secure(serves_https(&config.base_url))
        // Lax: the cookie must come back on Stripe's redirect to /checkout/complete
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_cookie_only_over_https() {
        assert!(serves_https("https://shop.example.ro"));
        assert!(!serves_https("http://localhost:3000"));
    }
}
