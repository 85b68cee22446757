//! Product catalog queries.

use sqlx::PgPool;

use bearing_shop_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

const PRODUCT_COLUMNS: &str = r"
    p.id, p.family_id, p.part_number, p.name, p.description, p.brand, p.origin,
    p.price, p.stock, p.images, p.dimensions, p.load_ratings, p.technical_features,
    p.suffix_descriptions, p.parallel_products, p.active, p.created_at, p.updated_at
";

/// Search and filter options for the catalog listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Matched against part number, name and cross-reference part numbers.
    pub query: Option<String>,
    pub family_slug: Option<String>,
    pub brand: Option<String>,
}

impl ProductFilter {
    fn pattern(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", escape_like(q)))
    }
}

/// Escape `LIKE` wildcards in user input.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of active products matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        const WHERE: &str = r"
            FROM products p
            LEFT JOIN product_families f ON f.id = p.family_id
            WHERE p.active
              AND ($1::text IS NULL
                   OR p.part_number ILIKE $1
                   OR p.name ILIKE $1
                   OR EXISTS (
                       SELECT 1 FROM jsonb_array_elements(p.parallel_products) pp
                       WHERE pp->>'part_number' ILIKE $1
                   ))
              AND ($2::text IS NULL OR f.slug = $2)
              AND ($3::text IS NULL OR LOWER(p.brand) = LOWER($3))
        ";

        let pattern = filter.pattern();
        let family = filter.family_slug.as_deref().filter(|s| !s.is_empty());
        let brand = filter.brand.as_deref().filter(|s| !s.is_empty());

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} {WHERE} ORDER BY p.part_number LIMIT $4 OFFSET $5"
        ))
        .bind(&pattern)
        .bind(family)
        .bind(brand)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {WHERE}"))
            .bind(&pattern)
            .bind(family)
            .bind(brand)
            .fetch_one(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Get an active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1 AND p.active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Active products among `ids`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many_active(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i32> = ids.iter().map(|id| id.as_i32()).collect();

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1) AND p.active"
        ))
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Active products in a family.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_family(
        &self,
        family_id: bearing_shop_core::ProductFamilyId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE p.family_id = $1 AND p.active
             ORDER BY p.part_number"
        ))
        .bind(family_id)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Distinct brands of active products, for the filter dropdown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn brands(&self) -> Result<Vec<String>, RepositoryError> {
        let brands = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT brand FROM products
            WHERE active AND brand IS NOT NULL AND brand <> ''
            ORDER BY brand
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(brands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("62_05%"), "62\\_05\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_filter_pattern() {
        let filter = ProductFilter {
            query: Some("  6205 ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(filter.pattern().as_deref(), Some("%6205%"));

        let blank = ProductFilter {
            query: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(blank.pattern(), None);
    }
}
