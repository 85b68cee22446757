//! Product family CRUD.

use sqlx::PgPool;

use bearing_shop_core::ProductFamilyId;

use super::{RepositoryError, conflict_on_unique, expect_row};
use crate::models::{FamilyInput, ProductFamily};

const DUPLICATE_SLUG: &str = "a family with this slug already exists";

/// Repository for `product_families`.
pub struct FamilyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FamilyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All families with their product counts, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ProductFamily>, RepositoryError> {
        let families = sqlx::query_as::<_, ProductFamily>(
            r"
            SELECT f.id, f.name, f.slug, f.description, f.brand, f.images,
                   COUNT(p.id) AS product_count
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

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductFamilyId) -> Result<Option<ProductFamily>, RepositoryError> {
        let family = sqlx::query_as::<_, ProductFamily>(
            r"
            SELECT f.id, f.name, f.slug, f.description, f.brand, f.images,
                   (SELECT COUNT(*) FROM products p WHERE p.family_id = f.id) AS product_count
            FROM product_families f
            WHERE f.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(family)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &FamilyInput) -> Result<ProductFamilyId, RepositoryError> {
        let id = sqlx::query_scalar::<_, ProductFamilyId>(
            r"
            INSERT INTO product_families (name, slug, description, brand)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.brand.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_SLUG))?;

        tracing::info!(family_id = %id, slug = %input.slug, "Created product family");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Conflict`.
    pub async fn update(
        &self,
        id: ProductFamilyId,
        input: &FamilyInput,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE product_families
            SET name = $2, slug = $3, description = $4, brand = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.brand.as_deref())
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_SLUG))?;

        expect_row(result.rows_affected())
    }

    /// Delete a family. Its products stay, unassigned. Returns the family's
    /// image URLs for storage cleanup.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the family does not exist.
    pub async fn delete(&self, id: ProductFamilyId) -> Result<Vec<String>, RepositoryError> {
        sqlx::query_scalar::<_, Vec<String>>(
            "DELETE FROM product_families WHERE id = $1 RETURNING images",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the family does not exist.
    pub async fn add_image(&self, id: ProductFamilyId, url: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE product_families SET images = array_append(images, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;

        expect_row(result.rows_affected())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the family does not exist.
    pub async fn remove_image(&self, id: ProductFamilyId, url: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE product_families SET images = array_remove(images, $2) WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;

        expect_row(result.rows_affected())
    }
}
