//! Home page content: sections, blocks, translations, banners and the footer.
//!
//! Sections, blocks and banners are ordered by `position`. Moving a row
//! first renumbers its siblings `0..n` (ties broken by id) and then swaps it
//! with its neighbour, so rows created with the default position still move.

use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use bearing_shop_core::content::{BlockType, FooterContent};
use bearing_shop_core::{BannerId, ContentBlockId, HomeSectionId, Locale};

use super::{RepositoryError, conflict_on_unique, expect_row};
use crate::models::{Banner, BannerInput, Block, BlockTranslation, Section, SectionTranslation};

/// Which way to move a row in its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// An ordered table, optionally partitioned by a parent column.
#[derive(Debug, Clone, Copy)]
struct Ordered {
    table: &'static str,
    scope_column: Option<&'static str>,
}

const SECTIONS: Ordered = Ordered {
    table: "home_sections",
    scope_column: None,
};
const BLOCKS: Ordered = Ordered {
    table: "home_content_blocks",
    scope_column: Some("section_id"),
};
const BANNERS: Ordered = Ordered {
    table: "banners",
    scope_column: None,
};

impl Ordered {
    fn scope_filter(self) -> String {
        self.scope_column
            .map_or_else(|| "TRUE".to_owned(), |column| format!("{column} = $1"))
    }

    /// Renumber the rows in `scope` to `0..n`.
    async fn renumber(
        self,
        tx: &mut Transaction<'_, Postgres>,
        scope: i32,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r"
            UPDATE {table} t SET position = r.rn
            FROM (
                SELECT id, (ROW_NUMBER() OVER (ORDER BY position, id) - 1)::int AS rn
                FROM {table}
                WHERE {filter}
            ) r
            WHERE t.id = r.id AND t.position <> r.rn
            ",
            table = self.table,
            filter = self.scope_filter(),
        );
        let query = sqlx::query(&sql);
        let query = if self.scope_column.is_some() {
            query.bind(scope)
        } else {
            query
        };
        query.execute(&mut **tx).await?;
        Ok(())
    }

    /// Swap row `id` with its neighbour. Returns `false` at either end.
    async fn move_row(
        self,
        pool: &PgPool,
        id: i32,
        direction: Direction,
    ) -> Result<bool, RepositoryError> {
        let mut tx = pool.begin().await?;

        let scope = match self.scope_column {
            Some(column) => sqlx::query_scalar::<_, i32>(&format!(
                "SELECT {column} FROM {table} WHERE id = $1",
                table = self.table
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?,
            None => 0,
        };

        self.renumber(&mut tx, scope).await?;

        let position = sqlx::query_scalar::<_, i32>(&format!(
            "SELECT position FROM {table} WHERE id = $1",
            table = self.table
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let target = match direction {
            Direction::Up => position - 1,
            Direction::Down => position + 1,
        };
        let neighbour_sql = match self.scope_column {
            Some(column) => format!(
                "SELECT id FROM {table} WHERE {column} = $1 AND position = $2",
                table = self.table
            ),
            None => format!(
                "SELECT id FROM {table} WHERE $1 = $1 AND position = $2",
                table = self.table
            ),
        };
        let neighbour = sqlx::query_scalar::<_, i32>(&neighbour_sql)
            .bind(scope)
            .bind(target)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(neighbour) = neighbour else {
            tx.commit().await?;
            return Ok(false);
        };

        let swap = format!(
            "UPDATE {table} SET position = CASE WHEN id = $1 THEN $3 ELSE $4 END WHERE id IN ($1, $2)",
            table = self.table
        );
        sqlx::query(&swap)
            .bind(id)
            .bind(neighbour)
            .bind(target)
            .bind(position)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Position after the last row in `scope`.
    async fn next_position(self, pool: &PgPool, scope: i32) -> Result<i32, RepositoryError> {
        let sql = format!(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE {filter}",
            table = self.table,
            filter = self.scope_filter(),
        );
        let query = sqlx::query_scalar::<_, i32>(&sql);
        let query = if self.scope_column.is_some() {
            query.bind(scope)
        } else {
            query
        };
        Ok(query.fetch_one(pool).await?)
    }
}

/// Repository for sections, blocks and their translations.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Sections
    // =========================================================================

    /// All sections in display order, with block counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn sections(&self) -> Result<Vec<Section>, RepositoryError> {
        let sections = sqlx::query_as::<_, Section>(
            r"
            SELECT s.id, s.section_key, s.title, s.subtitle, s.position, s.is_active,
                   COUNT(b.id) AS block_count
            FROM home_sections s
            LEFT JOIN home_content_blocks b ON b.section_id = s.id
            GROUP BY s.id
            ORDER BY s.position, s.id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(sections)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn section(&self, id: HomeSectionId) -> Result<Option<Section>, RepositoryError> {
        let section = sqlx::query_as::<_, Section>(
            r"
            SELECT s.id, s.section_key, s.title, s.subtitle, s.position, s.is_active,
                   (SELECT COUNT(*) FROM home_content_blocks b WHERE b.section_id = s.id)
                       AS block_count
            FROM home_sections s
            WHERE s.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(section)
    }

    /// Add a section at the end of the page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key is taken.
    pub async fn create_section(
        &self,
        key: &str,
        title: Option<&str>,
        subtitle: Option<&str>,
    ) -> Result<HomeSectionId, RepositoryError> {
        let position = SECTIONS.next_position(self.pool, 0).await?;
        let id = sqlx::query_scalar::<_, HomeSectionId>(
            r"
            INSERT INTO home_sections (section_key, title, subtitle, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(key)
        .bind(title)
        .bind(subtitle)
        .bind(position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a section with this key already exists"))?;

        tracing::info!(section_id = %id, key, "Created home section");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    pub async fn update_section(
        &self,
        id: HomeSectionId,
        title: Option<&str>,
        subtitle: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE home_sections SET title = $2, subtitle = $3 WHERE id = $1")
                .bind(id)
                .bind(title)
                .bind(subtitle)
                .execute(self.pool)
                .await?;

        expect_row(result.rows_affected())
    }

    /// Flip a section's visibility. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    pub async fn toggle_section(&self, id: HomeSectionId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE home_sections SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    pub async fn move_section(
        &self,
        id: HomeSectionId,
        direction: Direction,
    ) -> Result<bool, RepositoryError> {
        SECTIONS.move_row(self.pool, id.as_i32(), direction).await
    }

    /// Delete a section with its blocks and translations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    pub async fn delete_section(&self, id: HomeSectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM home_sections WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        expect_row(result.rows_affected())
    }

    /// Heading overlay for a locale, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn section_translation(
        &self,
        id: HomeSectionId,
        locale: &Locale,
    ) -> Result<Option<SectionTranslation>, RepositoryError> {
        let translation = sqlx::query_as::<_, SectionTranslation>(
            r"
            SELECT section_id, locale, title, subtitle
            FROM home_section_translations
            WHERE section_id = $1 AND locale = $2
            ",
        )
        .bind(id)
        .bind(locale.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(translation)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_section_translation(
        &self,
        id: HomeSectionId,
        locale: &Locale,
        title: Option<&str>,
        subtitle: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO home_section_translations (section_id, locale, title, subtitle)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (section_id, locale)
            DO UPDATE SET title = EXCLUDED.title, subtitle = EXCLUDED.subtitle
            ",
        )
        .bind(id)
        .bind(locale.as_str())
        .bind(title)
        .bind(subtitle)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Blocks of a section in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn blocks(&self, section_id: HomeSectionId) -> Result<Vec<Block>, RepositoryError> {
        let blocks = sqlx::query_as::<_, Block>(
            r"
            SELECT id, section_id, block_key, block_type, content, position, is_active
            FROM home_content_blocks
            WHERE section_id = $1
            ORDER BY position, id
            ",
        )
        .bind(section_id)
        .fetch_all(self.pool)
        .await?;

        Ok(blocks)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn block(&self, id: ContentBlockId) -> Result<Option<Block>, RepositoryError> {
        let block = sqlx::query_as::<_, Block>(
            r"
            SELECT id, section_id, block_key, block_type, content, position, is_active
            FROM home_content_blocks
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(block)
    }

    /// Add an empty block at the end of a section.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the key is taken in the section.
    pub async fn create_block(
        &self,
        section_id: HomeSectionId,
        key: &str,
        block_type: BlockType,
    ) -> Result<ContentBlockId, RepositoryError> {
        let position = BLOCKS.next_position(self.pool, section_id.as_i32()).await?;
        let id = sqlx::query_scalar::<_, ContentBlockId>(
            r"
            INSERT INTO home_content_blocks (section_id, block_key, block_type, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(section_id)
        .bind(key)
        .bind(block_type)
        .bind(position)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "this section already has a block with that key"))?;

        tracing::info!(block_id = %id, section_id = %section_id, key, "Created content block");
        Ok(id)
    }

    /// Replace a block's base payload.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the block does not exist.
    pub async fn update_block_content(
        &self,
        id: ContentBlockId,
        content: &Value,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE home_content_blocks SET content = $2 WHERE id = $1")
            .bind(id)
            .bind(content)
            .execute(self.pool)
            .await?;

        expect_row(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the block does not exist.
    pub async fn toggle_block(&self, id: ContentBlockId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            r"
            UPDATE home_content_blocks SET is_active = NOT is_active
            WHERE id = $1
            RETURNING is_active
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the block does not exist.
    pub async fn move_block(
        &self,
        id: ContentBlockId,
        direction: Direction,
    ) -> Result<bool, RepositoryError> {
        BLOCKS.move_row(self.pool, id.as_i32(), direction).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the block does not exist.
    pub async fn delete_block(&self, id: ContentBlockId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM home_content_blocks WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        expect_row(result.rows_affected())
    }

    // =========================================================================
    // Block translations
    // =========================================================================

    /// Locales that have an overlay for this block.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn block_translations(
        &self,
        id: ContentBlockId,
    ) -> Result<Vec<BlockTranslation>, RepositoryError> {
        let translations = sqlx::query_as::<_, BlockTranslation>(
            r"
            SELECT block_id, locale, content
            FROM home_content_block_translations
            WHERE block_id = $1
            ORDER BY locale
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(translations)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save_block_translation(
        &self,
        id: ContentBlockId,
        locale: &Locale,
        content: &Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO home_content_block_translations (block_id, locale, content)
            VALUES ($1, $2, $3)
            ON CONFLICT (block_id, locale)
            DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
            ",
        )
        .bind(id)
        .bind(locale.as_str())
        .bind(content)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there was no overlay.
    pub async fn delete_block_translation(
        &self,
        id: ContentBlockId,
        locale: &Locale,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM home_content_block_translations WHERE block_id = $1 AND locale = $2",
        )
        .bind(id)
        .bind(locale.as_str())
        .execute(self.pool)
        .await?;

        expect_row(result.rows_affected())
    }
}

/// Repository for `banners`.
pub struct BannerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BannerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Banner>, RepositoryError> {
        let banners = sqlx::query_as::<_, Banner>(
            r"
            SELECT id, title, subtitle, image_url, link_url, position, is_active,
                   starts_at, ends_at
            FROM banners
            ORDER BY position, id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(banners)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BannerId) -> Result<Option<Banner>, RepositoryError> {
        let banner = sqlx::query_as::<_, Banner>(
            r"
            SELECT id, title, subtitle, image_url, link_url, position, is_active,
                   starts_at, ends_at
            FROM banners
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(banner)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &BannerInput) -> Result<BannerId, RepositoryError> {
        let id = sqlx::query_scalar::<_, BannerId>(
            r"
            INSERT INTO banners (title, subtitle, image_url, link_url, position, is_active,
                                 starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.is_active)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(banner_id = %id, "Created banner");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn update(&self, id: BannerId, input: &BannerInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE banners SET
                title = $2, subtitle = $3, image_url = $4, link_url = $5, position = $6,
                is_active = $7, starts_at = $8, ends_at = $9
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.is_active)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .execute(self.pool)
        .await?;

        expect_row(result.rows_affected())
    }

    /// Point the banner at an uploaded image. Returns the previous URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn set_image(
        &self,
        id: BannerId,
        url: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar::<_, Option<String>>(
            r"
            UPDATE banners b SET image_url = $2
            FROM (SELECT id, image_url FROM banners WHERE id = $1) old
            WHERE b.id = old.id
            RETURNING old.image_url
            ",
        )
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn move_banner(&self, id: BannerId, direction: Direction) -> Result<bool, RepositoryError> {
        BANNERS.move_row(self.pool, id.as_i32(), direction).await
    }

    /// Delete a banner and return its image URL for storage cleanup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner does not exist.
    pub async fn delete(&self, id: BannerId) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM banners WHERE id = $1 RETURNING image_url",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Repository for `footer_content`.
pub struct FooterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FooterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Locales that have a footer, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn locales(&self) -> Result<Vec<String>, RepositoryError> {
        let locales =
            sqlx::query_scalar::<_, String>("SELECT locale FROM footer_content ORDER BY locale")
                .fetch_all(self.pool)
                .await?;

        Ok(locales)
    }

    /// The footer for exactly this locale, without fallback.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, locale: &Locale) -> Result<Option<FooterContent>, RepositoryError> {
        let content = sqlx::query_scalar::<_, Value>(
            "SELECT content FROM footer_content WHERE locale = $1",
        )
        .bind(locale.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(content.as_ref().map(FooterContent::from_value))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the footer cannot be
    /// serialized, or `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, locale: &Locale, footer: &FooterContent) -> Result<(), RepositoryError> {
        let content = serde_json::to_value(footer)
            .map_err(|e| RepositoryError::DataCorruption(format!("footer content: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO footer_content (locale, content)
            VALUES ($1, $2)
            ON CONFLICT (locale) DO UPDATE SET content = EXCLUDED.content
            ",
        )
        .bind(locale.as_str())
        .bind(&content)
        .execute(self.pool)
        .await?;

        tracing::info!(locale = %locale.as_str(), "Saved footer");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_filter() {
        assert_eq!(SECTIONS.scope_filter(), "TRUE");
        assert_eq!(BLOCKS.scope_filter(), "section_id = $1");
    }

    #[test]
    fn test_direction_deserializes_lowercase() {
        let up: Direction = serde_json::from_str("\"up\"").unwrap_or(Direction::Down);
        assert_eq!(up, Direction::Up);
    }
}
