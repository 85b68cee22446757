//! Product family queries.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{FamilySummary, ProductFamily};

/// Repository for product families.
pub struct FamilyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FamilyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All families with their active product counts, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<FamilySummary>, RepositoryError> {
        let families = sqlx::query_as::<_, FamilySummary>(
            r"
            SELECT f.id, f.name, f.slug, f.description, f.brand, f.images,
                   COUNT(p.id) FILTER (WHERE p.active) AS product_count
            FROM product_families f
            LEFT JOIN products p ON p.family_id = f.id
            GROUP BY f.id
            ORDER BY f.name
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(families)
    }

    /// Get a family by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<ProductFamily>, RepositoryError> {
        let family = sqlx::query_as::<_, ProductFamily>(
            r"
            SELECT id, name, slug, description, brand, images
            FROM product_families
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(family)
    }

    /// Get a family by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: bearing_shop_core::ProductFamilyId,
    ) -> Result<Option<ProductFamily>, RepositoryError> {
        let family = sqlx::query_as::<_, ProductFamily>(
            r"
            SELECT id, name, slug, description, brand, images
            FROM product_families
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(family)
    }
}
