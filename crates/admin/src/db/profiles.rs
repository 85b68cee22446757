//! Profile lookups for staff sign-in.

use sqlx::PgPool;

use bearing_shop_core::{ProfileRole, UserId};

use super::RepositoryError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: ProfileRole,
}

/// Repository for `profiles`. Roles are granted with `bs-cli role grant`,
/// never from the panel.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, role FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }
}
