//! Seed the catalog and home page content from YAML files.
//!
//! Seeding is idempotent: families are matched by slug, products by part
//! number, sections by key and blocks by key within their section, so a
//! file can be edited and loaded again. Each file is validated in full
//! before the database is touched and written in a single transaction.
//!
//! See `seeds/catalog.yaml` and `seeds/content.yaml` for the formats.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use bearing_shop_core::catalog::{
    Dimensions, LoadRatings, ParallelProduct, SuffixDescription, TechnicalFeature, slugify,
};
use bearing_shop_core::content::{BlockContent, BlockType, FooterContent};
use bearing_shop_core::Locale;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, info};

use super::{CommandError, connect};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A product names a family slug that is neither in the file nor in the database.
    #[error("Product {part_number} references unknown family '{family}'")]
    UnknownFamily { part_number: String, family: String },
}

// =============================================================================
// File formats
// =============================================================================

const fn default_true() -> bool {
    true
}

/// `seed catalog` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogSeed {
    #[serde(default)]
    pub families: Vec<FamilySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilySeed {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl FamilySeed {
    fn slug(&self) -> String {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| slugify(&self.name), str::to_owned)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub part_number: String,
    pub name: String,
    /// Family slug.
    pub family: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub origin: Option<String>,
    /// Price in the base currency.
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub load_ratings: LoadRatings,
    #[serde(default)]
    pub technical_features: Vec<TechnicalFeature>,
    #[serde(default)]
    pub suffix_descriptions: Vec<SuffixDescription>,
    #[serde(default)]
    pub parallel_products: Vec<ParallelProduct>,
}

/// `seed content` file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentSeed {
    /// Home page sections in display order.
    #[serde(default)]
    pub sections: Vec<SectionSeed>,
    /// Footer per locale tag.
    #[serde(default)]
    pub footer: BTreeMap<String, FooterContent>,
    /// Banners in display order, matched by title.
    #[serde(default)]
    pub banners: Vec<BannerSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionSeed {
    pub key: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub translations: BTreeMap<String, HeadingSeed>,
    /// Blocks in display order.
    #[serde(default)]
    pub blocks: Vec<BlockSeed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadingSeed {
    pub title: Option<String>,
    pub subtitle: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockSeed {
    pub key: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default = "empty_object")]
    pub content: Value,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Overlay per locale tag; translatable keys only.
    #[serde(default)]
    pub translations: BTreeMap<String, Value>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BannerSeed {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Validation
// =============================================================================

/// Check a catalog file, returning every problem found.
#[must_use]
pub fn validate_catalog(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let mut slugs = HashSet::new();
    for family in &seed.families {
        if family.name.trim().is_empty() {
            errors.push("family with an empty name".to_owned());
            continue;
        }
        let slug = family.slug();
        if slug.is_empty() {
            errors.push(format!("family '{}' has no usable slug", family.name));
        } else if !slugs.insert(slug.clone()) {
            errors.push(format!("duplicate family slug '{slug}'"));
        }
    }

    let mut part_numbers = HashSet::new();
    for product in &seed.products {
        let part = product.part_number.trim();
        if part.is_empty() {
            errors.push(format!("product '{}' has no part number", product.name));
            continue;
        }
        if !part_numbers.insert(part.to_owned()) {
            errors.push(format!("duplicate part number '{part}'"));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("product {part} has no name"));
        }
        if product.price.is_sign_negative() {
            errors.push(format!("product {part} has a negative price"));
        }
        if product.stock < 0 {
            errors.push(format!("product {part} has negative stock"));
        }
    }

    errors
}

fn check_locale(tag: &str, context: &str, errors: &mut Vec<String>) -> Option<Locale> {
    match Locale::parse(tag) {
        Ok(locale) => Some(locale),
        Err(e) => {
            errors.push(format!("{context}: locale '{tag}': {e}"));
            None
        }
    }
}

/// Check a content file, returning every problem found.
#[must_use]
pub fn validate_content(seed: &ContentSeed) -> Vec<String> {
    let mut errors = Vec::new();

    let mut section_keys = HashSet::new();
    for section in &seed.sections {
        let key = section.key.trim();
        if key.is_empty() {
            errors.push("section with an empty key".to_owned());
            continue;
        }
        if !section_keys.insert(key.to_owned()) {
            errors.push(format!("duplicate section key '{key}'"));
        }
        for tag in section.translations.keys() {
            check_locale(tag, &format!("section {key}"), &mut errors);
        }

        let mut block_keys = HashSet::new();
        for block in &section.blocks {
            let context = format!("section {key}, block {}", block.key);
            if block.key.trim().is_empty() {
                errors.push(format!("section {key}: block with an empty key"));
                continue;
            }
            if !block_keys.insert(block.key.trim().to_owned()) {
                errors.push(format!("{context}: duplicate block key"));
            }
            if let Err(e) = BlockContent::parse(block.block_type, &block.content) {
                errors.push(format!("{context}: {e}"));
            }

            let translatable = block.block_type.translatable_fields();
            for (tag, overlay) in &block.translations {
                check_locale(tag, &context, &mut errors);
                let Value::Object(map) = overlay else {
                    errors.push(format!("{context}: {tag} translation must be a mapping"));
                    continue;
                };
                for field in map.keys() {
                    if !translatable.iter().any(|f| f == field) {
                        errors.push(format!(
                            "{context}: '{field}' is not translatable for {} blocks",
                            block.block_type
                        ));
                    }
                }
            }
        }
    }

    for tag in seed.footer.keys() {
        check_locale(tag, "footer", &mut errors);
    }

    for banner in &seed.banners {
        if banner.title.trim().is_empty() {
            errors.push("banner with an empty title".to_owned());
        }
        if let (Some(starts), Some(ends)) = (banner.starts_at, banner.ends_at)
            && ends <= starts
        {
            errors.push(format!("banner '{}' ends before it starts", banner.title));
        }
    }

    errors
}

fn report(errors: &[String]) -> Result<(), SeedError> {
    if errors.is_empty() {
        info!("Configuration validated successfully");
        return Ok(());
    }
    error!("Configuration validation failed:");
    for err in errors {
        error!("  - {err}");
    }
    Err(SeedError::Invalid(errors.len()))
}

async fn read_file(file_path: &str) -> Result<String, SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::FileNotFound(file_path.to_owned()));
    }
    info!(path = %file_path, "Loading seed file");
    Ok(tokio::fs::read_to_string(path).await?)
}

// =============================================================================
// Writers
// =============================================================================

/// Rows written by one seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl SeedSummary {
    const fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.updated += 1;
        }
    }
}

fn blank_to_none(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Upsert families, then products.
///
/// # Errors
///
/// Returns an error if a product names an unknown family or a query fails;
/// nothing is written in that case.
pub async fn seed_catalog(pool: &PgPool, seed: &CatalogSeed) -> Result<SeedSummary, SeedError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    let mut family_ids: HashMap<String, i32> = HashMap::new();

    for family in &seed.families {
        let slug = family.slug();
        let (id, inserted): (i32, bool) = sqlx::query_as(
            r"
            INSERT INTO product_families (name, slug, description, brand, images)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                brand = EXCLUDED.brand,
                images = EXCLUDED.images
            RETURNING id, (xmax = 0)
            ",
        )
        .bind(family.name.trim())
        .bind(&slug)
        .bind(blank_to_none(family.description.as_ref()))
        .bind(blank_to_none(family.brand.as_ref()))
        .bind(&family.images)
        .fetch_one(&mut *tx)
        .await?;

        summary.record(inserted);
        family_ids.insert(slug, id);
    }

    for product in &seed.products {
        let family_id = match blank_to_none(product.family.as_ref()) {
            Some(slug) => Some(resolve_family(&mut tx, &family_ids, slug, product).await?),
            None => None,
        };

        let (inserted,): (bool,) = sqlx::query_as(
            r"
            INSERT INTO products (
                family_id, part_number, name, description, brand, origin, price, stock,
                active, images, dimensions, load_ratings, technical_features,
                suffix_descriptions, parallel_products
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (part_number) DO UPDATE SET
                family_id = EXCLUDED.family_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                brand = EXCLUDED.brand,
                origin = EXCLUDED.origin,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                active = EXCLUDED.active,
                images = EXCLUDED.images,
                dimensions = EXCLUDED.dimensions,
                load_ratings = EXCLUDED.load_ratings,
                technical_features = EXCLUDED.technical_features,
                suffix_descriptions = EXCLUDED.suffix_descriptions,
                parallel_products = EXCLUDED.parallel_products
            RETURNING (xmax = 0)
            ",
        )
        .bind(family_id)
        .bind(product.part_number.trim())
        .bind(product.name.trim())
        .bind(blank_to_none(product.description.as_ref()))
        .bind(blank_to_none(product.brand.as_ref()))
        .bind(blank_to_none(product.origin.as_ref()))
        .bind(product.price)
        .bind(product.stock)
        .bind(product.active)
        .bind(&product.images)
        .bind(Json(&product.dimensions))
        .bind(Json(&product.load_ratings))
        .bind(Json(&product.technical_features))
        .bind(Json(&product.suffix_descriptions))
        .bind(Json(&product.parallel_products))
        .fetch_one(&mut *tx)
        .await?;

        summary.record(inserted);
    }

    tx.commit().await?;
    Ok(summary)
}

/// Resolve a family slug from this file first, then from the database.
async fn resolve_family(
    tx: &mut Transaction<'_, Postgres>,
    seeded: &HashMap<String, i32>,
    slug: &str,
    product: &ProductSeed,
) -> Result<i32, SeedError> {
    if let Some(id) = seeded.get(slug) {
        return Ok(*id);
    }
    sqlx::query_scalar("SELECT id FROM product_families WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| SeedError::UnknownFamily {
            part_number: product.part_number.clone(),
            family: slug.to_owned(),
        })
}

/// Upsert sections with their blocks and translations, footers and banners.
///
/// Positions follow the order in the file.
///
/// # Errors
///
/// Returns an error if a query fails; nothing is written in that case.
pub async fn seed_content(pool: &PgPool, seed: &ContentSeed) -> Result<SeedSummary, SeedError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for (position, section) in (0_i32..).zip(&seed.sections) {
        let (section_id, inserted): (i32, bool) = sqlx::query_as(
            r"
            INSERT INTO home_sections (section_key, title, subtitle, position, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (section_key) DO UPDATE SET
                title = EXCLUDED.title,
                subtitle = EXCLUDED.subtitle,
                position = EXCLUDED.position,
                is_active = EXCLUDED.is_active
            RETURNING id, (xmax = 0)
            ",
        )
        .bind(section.key.trim())
        .bind(blank_to_none(section.title.as_ref()))
        .bind(blank_to_none(section.subtitle.as_ref()))
        .bind(position)
        .bind(section.active)
        .fetch_one(&mut *tx)
        .await?;
        summary.record(inserted);

        for (tag, heading) in &section.translations {
            let Ok(locale) = Locale::parse(tag) else { continue };
            sqlx::query(
                r"
                INSERT INTO home_section_translations (section_id, locale, title, subtitle)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (section_id, locale) DO UPDATE SET
                    title = EXCLUDED.title,
                    subtitle = EXCLUDED.subtitle
                ",
            )
            .bind(section_id)
            .bind(locale.as_str())
            .bind(blank_to_none(heading.title.as_ref()))
            .bind(blank_to_none(heading.subtitle.as_ref()))
            .execute(&mut *tx)
            .await?;
        }

        for (block_position, block) in (0_i32..).zip(&section.blocks) {
            let (block_id, inserted): (i32, bool) = sqlx::query_as(
                r"
                INSERT INTO home_content_blocks
                    (section_id, block_key, block_type, content, position, is_active)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (section_id, block_key) DO UPDATE SET
                    block_type = EXCLUDED.block_type,
                    content = EXCLUDED.content,
                    position = EXCLUDED.position,
                    is_active = EXCLUDED.is_active
                RETURNING id, (xmax = 0)
                ",
            )
            .bind(section_id)
            .bind(block.key.trim())
            .bind(block.block_type)
            .bind(&block.content)
            .bind(block_position)
            .bind(block.active)
            .fetch_one(&mut *tx)
            .await?;
            summary.record(inserted);

            for (tag, overlay) in &block.translations {
                let Ok(locale) = Locale::parse(tag) else { continue };
                sqlx::query(
                    r"
                    INSERT INTO home_content_block_translations (block_id, locale, content)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (block_id, locale) DO UPDATE SET
                        content = EXCLUDED.content,
                        updated_at = NOW()
                    ",
                )
                .bind(block_id)
                .bind(locale.as_str())
                .bind(overlay)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    for (tag, footer) in &seed.footer {
        let Ok(locale) = Locale::parse(tag) else { continue };
        let (inserted,): (bool,) = sqlx::query_as(
            r"
            INSERT INTO footer_content (locale, content)
            VALUES ($1, $2)
            ON CONFLICT (locale) DO UPDATE SET content = EXCLUDED.content
            RETURNING (xmax = 0)
            ",
        )
        .bind(locale.as_str())
        .bind(Json(footer))
        .fetch_one(&mut *tx)
        .await?;
        summary.record(inserted);
    }

    for (position, banner) in (0_i32..).zip(&seed.banners) {
        let updated = sqlx::query(
            r"
            UPDATE banners SET
                subtitle = $2, image_url = $3, link_url = $4, position = $5,
                is_active = $6, starts_at = $7, ends_at = $8
            WHERE title = $1
            ",
        )
        .bind(banner.title.trim())
        .bind(blank_to_none(banner.subtitle.as_ref()))
        .bind(blank_to_none(banner.image_url.as_ref()))
        .bind(blank_to_none(banner.link_url.as_ref()))
        .bind(position)
        .bind(banner.active)
        .bind(banner.starts_at)
        .bind(banner.ends_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                r"
                INSERT INTO banners
                    (title, subtitle, image_url, link_url, position, is_active, starts_at, ends_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(banner.title.trim())
            .bind(blank_to_none(banner.subtitle.as_ref()))
            .bind(blank_to_none(banner.image_url.as_ref()))
            .bind(blank_to_none(banner.link_url.as_ref()))
            .bind(position)
            .bind(banner.active)
            .bind(banner.starts_at)
            .bind(banner.ends_at)
            .execute(&mut *tx)
            .await?;
        }
        summary.record(updated == 0);
    }

    tx.commit().await?;
    Ok(summary)
}

// =============================================================================
// Commands
// =============================================================================

fn log_summary(summary: SeedSummary) {
    info!("Seeding complete!");
    info!("  Rows inserted: {}", summary.inserted);
    info!("  Rows updated: {}", summary.updated);
}

/// `bs-cli seed catalog -f <file>`
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or the database
/// write fails.
pub async fn catalog(file_path: &str) -> Result<(), SeedError> {
    let content = read_file(file_path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(
        families = seed.families.len(),
        products = seed.products.len(),
        "Parsed catalog"
    );
    report(&validate_catalog(&seed))?;

    let pool = connect().await?;
    log_summary(seed_catalog(&pool, &seed).await?);
    Ok(())
}

/// `bs-cli seed content -f <file>`
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or the database
/// write fails.
pub async fn content(file_path: &str) -> Result<(), SeedError> {
    let content = read_file(file_path).await?;
    let seed: ContentSeed = serde_yaml::from_str(&content)?;
    info!(
        sections = seed.sections.len(),
        footers = seed.footer.len(),
        banners = seed.banners.len(),
        "Parsed content"
    );
    report(&validate_content(&seed))?;

    let pool = connect().await?;
    log_summary(seed_content(&pool, &seed).await?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_seed_is_valid() {
        let seed: CatalogSeed =
            serde_yaml::from_str(include_str!("../../../../seeds/catalog.yaml")).unwrap();
        assert!(!seed.products.is_empty());
        assert_eq!(validate_catalog(&seed), Vec::<String>::new());
    }

    #[test]
    fn test_bundled_content_seed_is_valid() {
        let seed: ContentSeed =
            serde_yaml::from_str(include_str!("../../../../seeds/content.yaml")).unwrap();
        assert!(!seed.sections.is_empty());
        assert_eq!(validate_content(&seed), Vec::<String>::new());
    }

    #[test]
    fn test_family_slug_defaults_to_name() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
families:
  - name: Deep Groove Ball Bearings
  - name: Taper
    slug: taper-roller
"#,
        )
        .unwrap();
        assert_eq!(seed.families[0].slug(), "deep-groove-ball-bearings");
        assert_eq!(seed.families[1].slug(), "taper-roller");
    }

    #[test]
    fn test_catalog_validation_reports_every_problem() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
families:
  - name: Ball
  - name: Ball
products:
  - part_number: "6205"
    name: Ball bearing
    price: "12.50"
  - part_number: "6205"
    name: Duplicate
    price: "-1"
    stock: -3
"#,
        )
        .unwrap();
        let errors = validate_catalog(&seed);
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("duplicate family slug 'ball'")));
        assert!(errors.iter().any(|e| e.contains("duplicate part number '6205'")));
        assert!(errors.iter().any(|e| e.contains("negative price")));
        assert!(errors.iter().any(|e| e.contains("negative stock")));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result: Result<CatalogSeed, _> = serde_yaml::from_str(
            r#"
products:
  - part_number: "6205"
    name: Ball bearing
    price: "12.50"
    colour: blue
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_content_validation_checks_translations() {
        let seed: ContentSeed = serde_yaml::from_str(
            r#"
sections:
  - key: stats
    translations:
      english: { title: Numbers }
    blocks:
      - key: years
        type: stat
        content: { value: 25, label: Years }
        translations:
          ro: { label: Ani, value: "30" }
      - key: years
        type: text
        content: { title: [not, a, string] }
footer:
  xx-YYY: {}
"#,
        )
        .unwrap();
        let errors = validate_content(&seed);
        assert!(errors.iter().any(|e| e.contains("locale 'english'")), "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("'value' is not translatable")));
        assert!(errors.iter().any(|e| e.contains("duplicate block key")));
        assert!(errors.iter().any(|e| e.contains("invalid text content")));
        assert!(errors.iter().any(|e| e.contains("footer: locale 'xx-YYY'")));
    }

    #[test]
    fn test_banner_window_must_be_ordered() {
        let seed: ContentSeed = serde_yaml::from_str(
            r#"
banners:
  - title: Winter sale
    starts_at: 2026-12-31T00:00:00Z
    ends_at: 2026-12-01T00:00:00Z
"#,
        )
        .unwrap();
        assert_eq!(
            validate_content(&seed),
            vec!["banner 'Winter sale' ends before it starts".to_owned()]
        );
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = SeedSummary::default();
        summary.record(true);
        summary.record(false);
        summary.record(true);
        assert_eq!(
            summary,
            SeedSummary {
                inserted: 2,
                updated: 1
            }
        );
    }
}
