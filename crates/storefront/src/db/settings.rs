//! Per-user settings: display currency, locale and the mirrored cart.

use sqlx::PgPool;
use sqlx::types::Json;

use bearing_shop_core::{Cart, Currency, Locale, UserId};

use super::RepositoryError;

#[derive(Debug, Clone, sqlx::FromRow)]
struct SettingsRow {
    cart: Json<Cart>,
    currency: String,
    locale: String,
}

/// Stored settings, parsed.
#[derive(Debug, Clone, Default)]
pub struct UserSettings {
    pub cart: Cart,
    pub currency: Currency,
    pub locale: Option<Locale>,
}

impl From<SettingsRow> for UserSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            cart: row.cart.0,
            currency: row.currency.parse().unwrap_or_default(),
            locale: Locale::parse(&row.locale).ok(),
        }
    }
}

/// Repository for `user_settings`.
pub struct UserSettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserSettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user's settings, if a row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Option<UserSettings>, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT cart, currency, locale FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserSettings::from))
    }

    /// Replace the mirrored cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_settings (user_id, cart)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET cart = EXCLUDED.cart
            ",
        )
        .bind(user_id)
        .bind(Json(cart))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Store the display preferences.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_preferences(
        &self,
        user_id: UserId,
        currency: Currency,
        locale: &Locale,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_settings (user_id, currency, locale)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET currency = EXCLUDED.currency, locale = EXCLUDED.locale
            ",
        )
        .bind(user_id)
        .bind(currency.code())
        .bind(locale.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
