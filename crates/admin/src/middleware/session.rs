//! Staff sessions in the `admin.session` table, separate from customer
//! sessions. Strict same-site cookie with a one-day idle timeout.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AdminConfig;

pub const SESSION_COOKIE_NAME: &str = "bs_admin_session";

const IDLE_TIMEOUT: Duration = Duration::hours(24);

/// # Panics
///
/// Only if the store refuses the fixed `admin`/`session` identifiers.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &AdminConfig,
) -> SessionManagerLayer<PostgresStore> {
    // Table comes from the admin_sessions migration
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("admin")
        .expect("valid schema name")
        .with_table_name("session")
        .expect("valid table name");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_TIMEOUT))
        .with_secure(config.base_url.starts_with("https://"))
        .with_same_site(SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
