//! Home page content reads.

use sqlx::PgPool;

use bearing_shop_core::Locale;

use super::RepositoryError;
use crate::models::content::{BannerRow, BlockRow, SectionRow};

/// Repository for CMS tables.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active sections in position order, headings translated where a
    /// non-blank translation exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sections(&self, locale: &Locale) -> Result<Vec<SectionRow>, RepositoryError> {
        let sections = sqlx::query_as::<_, SectionRow>(
            r"
            SELECT s.id, s.section_key,
                   COALESCE(NULLIF(t.title, ''), s.title) AS title,
                   COALESCE(NULLIF(t.subtitle, ''), s.subtitle) AS subtitle,
                   s.position
            FROM home_sections s
            LEFT JOIN home_section_translations t
                   ON t.section_id = s.id AND t.locale = $1
            WHERE s.is_active
            ORDER BY s.position, s.id
            ",
        )
        .bind(locale.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(sections)
    }

    /// Active blocks of active sections, with the locale's overlay.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn blocks(&self, locale: &Locale) -> Result<Vec<BlockRow>, RepositoryError> {
        let blocks = sqlx::query_as::<_, BlockRow>(
            r"
            SELECT b.id, b.section_id, b.block_key, b.block_type, b.content,
                   t.content AS translation, b.position
            FROM home_content_blocks b
            JOIN home_sections s ON s.id = b.section_id
            LEFT JOIN home_content_block_translations t
                   ON t.block_id = b.id AND t.locale = $1
            WHERE b.is_active AND s.is_active
            ORDER BY b.section_id, b.position, b.id
            ",
        )
        .bind(locale.as_str())
        .fetch_all(self.pool)
        .await?;

        Ok(blocks)
    }

    /// Active banners. The date window is applied by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn banners(&self) -> Result<Vec<BannerRow>, RepositoryError> {
        let banners = sqlx::query_as::<_, BannerRow>(
            r"
            SELECT id, title, subtitle, image_url, link_url, position, starts_at, ends_at
            FROM banners
            WHERE is_active
            ORDER BY position, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(banners)
    }

    /// Footer blob for a locale, falling back to `fallback`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn footer(
        &self,
        locale: &Locale,
        fallback: &Locale,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        let content = sqlx::query_scalar::<_, serde_json::Value>(
            r"
            SELECT content FROM footer_content
            WHERE locale = $1 OR locale = $2
            ORDER BY (locale = $1) DESC
            LIMIT 1
            ",
        )
        .bind(locale.as_str())
        .bind(fallback.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(content)
    }
}
