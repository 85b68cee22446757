//! Product catalog writes and admin listings.

use sqlx::PgPool;
use sqlx::types::Json;

use bearing_shop_core::{ProductFamilyId, ProductId};

use super::{RepositoryError, conflict_on_unique, expect_row};
use crate::models::{Product, ProductInput, ProductListRow};

const PRODUCT_COLUMNS: &str = r"
    id, family_id, part_number, name, description, brand, origin, price, stock, images,
    dimensions, load_ratings, technical_features, suffix_descriptions, parallel_products,
    active, created_at, updated_at
";

const DUPLICATE_PART_NUMBER: &str = "a product with this part number already exists";

/// Escape `LIKE` wildcards in user input.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn search_pattern(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)))
}

/// Repository for `products`.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products (active or not) matching `query`, and the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: Option<&str>,
        family_id: Option<ProductFamilyId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ProductListRow>, i64), RepositoryError> {
        const WHERE: &str = r"
            FROM products p
            LEFT JOIN product_families f ON f.id = p.family_id
            WHERE ($1::text IS NULL
                   OR p.part_number ILIKE $1
                   OR p.name ILIKE $1
                   OR p.brand ILIKE $1)
              AND ($2::int IS NULL OR p.family_id = $2)
        ";
        let pattern = search_pattern(query);

        let rows = sqlx::query_as::<_, ProductListRow>(&format!(
            r"
            SELECT p.id, p.part_number, p.name, p.brand, f.name AS family_name, p.price,
                   p.stock, p.active, p.images[1] AS image
            {WHERE}
            ORDER BY p.part_number
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(&pattern)
        .bind(family_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(&pattern)
            .bind(family_id)
            .fetch_one(self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Insert a product with no images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the part number is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO products (family_id, part_number, name, description, brand, origin,
                                  price, stock, active, dimensions, load_ratings,
                                  technical_features, suffix_descriptions, parallel_products)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(input.family_id)
        .bind(&input.part_number)
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.brand.as_deref())
        .bind(input.origin.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.active)
        .bind(Json(&input.dimensions))
        .bind(Json(&input.load_ratings))
        .bind(Json(&input.technical_features))
        .bind(Json(&input.suffix_descriptions))
        .bind(Json(&input.parallel_products))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_PART_NUMBER))?;

        tracing::info!(product_id = %product.id, part_number = %product.part_number, "Created product");
        Ok(product)
    }

    /// Replace every editable field. Images are managed separately.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the part number is taken.
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products SET
                family_id = $2, part_number = $3, name = $4, description = $5, brand = $6,
                origin = $7, price = $8, stock = $9, active = $10, dimensions = $11,
                load_ratings = $12, technical_features = $13, suffix_descriptions = $14,
                parallel_products = $15
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(input.family_id)
        .bind(&input.part_number)
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(input.brand.as_deref())
        .bind(input.origin.as_deref())
        .bind(input.price)
        .bind(input.stock)
        .bind(input.active)
        .bind(Json(&input.dimensions))
        .bind(Json(&input.load_ratings))
        .bind(Json(&input.technical_features))
        .bind(Json(&input.suffix_descriptions))
        .bind(Json(&input.parallel_products))
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_PART_NUMBER))?;

        expect_row(result.rows_affected())
    }

    /// Flip the active flag. Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn toggle_active(&self, id: ProductId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE products SET active = NOT active WHERE id = $1 RETURNING active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Order lines keep their snapshot and lose the link.
    ///
    /// Returns the image URLs the product had, so the caller can remove the
    /// objects from storage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<Vec<String>, RepositoryError> {
        sqlx::query_scalar::<_, Vec<String>>("DELETE FROM products WHERE id = $1 RETURNING images")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Append an image URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add_image(&self, id: ProductId, url: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET images = array_append(images, $2) WHERE id = $1")
                .bind(id)
                .bind(url)
                .execute(self.pool)
                .await?;

        expect_row(result.rows_affected())
    }

    /// Drop an image URL from the list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn remove_image(&self, id: ProductId, url: &str) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET images = array_remove(images, $2) WHERE id = $1")
                .bind(id)
                .bind(url)
                .execute(self.pool)
                .await?;

        expect_row(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(Some(" 62_05 ")).as_deref(), Some("%62\\_05%"));
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(None), None);
    }
}
