//! Database operations for the storefront.
//!
//! # Database
//!
//! The storefront and the admin panel share one `PostgreSQL` database (the
//! Supabase project database). The storefront reads the catalog and home
//! page content, and writes orders, notifications, profiles and the
//! per-user settings row that mirrors the cart.
//!
//! # Migrations
//!
//! Migrations live in the workspace `migrations/` directory and run via:
//! ```bash
//! cargo run -p bearing-shop-cli -- migrate
//! ```

pub mod content;
pub mod families;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod profiles;
pub mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use content::ContentRepository;
pub use families::FamilyRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use products::{ProductFilter, ProductRepository};
pub use profiles::{Profile, ProfileRepository};
pub use settings::{UserSettings, UserSettingsRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
