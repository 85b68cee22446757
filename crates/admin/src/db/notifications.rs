//! Customer notifications written by the admin panel.
//!
//! Inserts fire the `notifications` trigger, so the storefront's live feed
//! picks them up without any extra signalling here.

use sqlx::PgPool;

use bearing_shop_core::{NotificationId, UserId};

use super::RepositoryError;

/// Repository for `notifications`.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a notification for a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        title: &str,
        message: &str,
        link_url: Option<&str>,
    ) -> Result<NotificationId, RepositoryError> {
        let id = sqlx::query_scalar::<_, NotificationId>(
            r"
            INSERT INTO notifications (user_id, title, message, link_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(link_url)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}
