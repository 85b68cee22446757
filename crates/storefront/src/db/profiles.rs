//! Customer profiles keyed by Supabase auth user ID.

use sqlx::PgPool;

use bearing_shop_core::{Email, ProfileRole, UserId};

use super::RepositoryError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub role: ProfileRole,
}

impl Profile {
    /// The stored email, validated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub fn parsed_email(&self) -> Result<Email, RepositoryError> {
        Email::parse(&self.email)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
    }
}

/// Repository for `profiles`.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the profile on first sign-in, or refresh its email.
    ///
    /// The role is never changed here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another profile already uses the email.
    pub async fn upsert(&self, id: UserId, email: &Email) -> Result<Profile, RepositoryError> {
        sqlx::query_as::<_, Profile>(
            r"
            INSERT INTO profiles (id, email)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, email, full_name, phone, company, role
            ",
        )
        .bind(id)
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })
    }

    /// Get a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, phone, company, role FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }
}
