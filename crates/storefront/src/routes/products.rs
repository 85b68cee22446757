//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use bearing_shop_core::catalog::{ParallelProduct, SuffixDescription, TechnicalFeature};
use bearing_shop_core::{Currency, ProductId};

use crate::db::{FamilyRepository, ProductFilter, ProductRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{FamilySummary, Product, ProductFamily};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Products per listing page.
pub const PAGE_SIZE: i64 = 24;

/// Product card data for listings.
#[derive(Clone)]
pub struct ProductCard {
    pub id: i32,
    pub part_number: String,
    pub name: String,
    pub brand: String,
    pub price: String,
    pub image: Option<String>,
    pub dimensions: Option<String>,
    pub in_stock: bool,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: Currency) -> Self {
        Self {
            id: product.id.as_i32(),
            part_number: product.part_number.clone(),
            name: product.name.clone(),
            brand: product.brand.clone().unwrap_or_default(),
            price: product.price_in(currency).display(),
            image: product.primary_image().map(str::to_owned),
            dimensions: product.dimensions.summary(),
            in_stock: product.in_stock(),
        }
    }
}

/// A labelled technical value, e.g. `Bore (d)` / `25 mm`.
#[derive(Clone)]
pub struct SpecRow {
    pub label: &'static str,
    pub value: String,
}

fn push_spec(rows: &mut Vec<SpecRow>, label: &'static str, value: Option<f64>, unit: &str) {
    if let Some(v) = value {
        rows.push(SpecRow {
            label,
            value: format!("{v} {unit}"),
        });
    }
}

/// Product detail display data.
#[derive(Clone)]
pub struct ProductDetail {
    pub card: ProductCard,
    pub description: String,
    pub origin: String,
    pub stock: i32,
    pub images: Vec<String>,
    pub dimensions: Vec<SpecRow>,
    pub load_ratings: Vec<SpecRow>,
    pub technical_features: Vec<TechnicalFeature>,
    pub suffix_descriptions: Vec<SuffixDescription>,
    pub parallel_products: Vec<ParallelProduct>,
}

impl ProductDetail {
    #[must_use]
    pub fn new(product: &Product, currency: Currency) -> Self {
        let mut dimensions = Vec::new();
        let d = &product.dimensions;
        push_spec(&mut dimensions, "Bore (d)", d.bore_mm, "mm");
        push_spec(&mut dimensions, "Outer diameter (D)", d.outer_diameter_mm, "mm");
        push_spec(&mut dimensions, "Width (B)", d.width_mm, "mm");
        push_spec(&mut dimensions, "Weight", d.weight_kg, "kg");

        let mut load_ratings = Vec::new();
        let r = &product.load_ratings;
        push_spec(&mut load_ratings, "Dynamic load rating (C)", r.dynamic_kn, "kN");
        push_spec(&mut load_ratings, "Static load rating (C0)", r.static_kn, "kN");
        push_spec(&mut load_ratings, "Fatigue load limit (Pu)", r.fatigue_limit_kn, "kN");
        push_spec(&mut load_ratings, "Reference speed", r.reference_speed_rpm, "r/min");
        push_spec(&mut load_ratings, "Limiting speed", r.limiting_speed_rpm, "r/min");

        Self {
            card: ProductCard::new(product, currency),
            description: product.description.clone().unwrap_or_default(),
            origin: product.origin.clone().unwrap_or_default(),
            stock: product.stock,
            images: product.images.clone(),
            dimensions,
            load_ratings,
            technical_features: product.technical_features.0.clone(),
            suffix_descriptions: product.suffix_descriptions.0.clone(),
            parallel_products: product.parallel_products.0.clone(),
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub family: Option<String>,
    pub brand: Option<String>,
    pub page: Option<u32>,
}

impl ListingQuery {
    fn filter(&self) -> ProductFilter {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        ProductFilter {
            query: clean(&self.q),
            family_slug: clean(&self.family),
            brand: clean(&self.brand),
        }
    }

    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Number of pages for `total` results, at least one.
#[must_use]
pub fn page_count(total: i64) -> u32 {
    let pages = (total.max(0) + PAGE_SIZE - 1) / PAGE_SIZE;
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

/// Query string for another page of the same listing.
#[must_use]
pub fn page_link(filter: &ProductFilter, page: u32) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    if let Some(q) = &filter.query {
        params.append_pair("q", q);
    }
    if let Some(family) = &filter.family_slug {
        params.append_pair("family", family);
    }
    if let Some(brand) = &filter.brand {
        params.append_pair("brand", brand);
    }
    params.append_pair("page", &page.to_string());
    format!("/products?{}", params.finish())
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    pub families: Vec<FamilySummary>,
    pub brands: Vec<String>,
    pub query: String,
    pub family: String,
    pub brand: String,
    pub total: i64,
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetail,
    pub family: Option<ProductFamily>,
}

/// Display the product listing.
#[instrument(skip(state, layout))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter();
    let page = query.page();
    let offset = i64::from(page - 1) * PAGE_SIZE;

    let (products, total) = ProductRepository::new(state.pool())
        .search(&filter, PAGE_SIZE, offset)
        .await?;
    let families = FamilyRepository::new(state.pool()).list().await?;
    let brands = ProductRepository::new(state.pool()).brands().await?;

    let total_pages = page_count(total);
    let prev_link = (page > 1).then(|| page_link(&filter, page - 1));
    let next_link = (page < total_pages).then(|| page_link(&filter, page + 1));

    Ok(ProductsIndexTemplate {
        products: products
            .iter()
            .map(|p| ProductCard::new(p, layout.currency))
            .collect(),
        families,
        brands,
        query: filter.query.unwrap_or_default(),
        family: filter.family_slug.unwrap_or_default(),
        brand: filter.brand.unwrap_or_default(),
        total,
        current_page: page,
        total_pages,
        prev_link,
        next_link,
        layout,
    })
}

/// Display a single product.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get_active(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let family = match product.family_id {
        Some(family_id) => FamilyRepository::new(state.pool()).get(family_id).await?,
        None => None,
    };

    Ok(ProductShowTemplate {
        product: ProductDetail::new(&product, layout.currency),
        family,
        layout,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::fixtures;
    use bearing_shop_core::catalog::Dimensions;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(24), 1);
        assert_eq!(page_count(25), 2);
        assert_eq!(page_count(49), 3);
    }

    #[test]
    fn test_page_link_keeps_filters() {
        let filter = ProductFilter {
            query: Some("6205 2rs".to_owned()),
            family_slug: None,
            brand: Some("SKF".to_owned()),
        };
        assert_eq!(page_link(&filter, 2), "/products?q=6205+2rs&brand=SKF&page=2");
    }

    #[test]
    fn test_listing_query_ignores_blank_values() {
        let query = ListingQuery {
            q: Some("  ".to_owned()),
            family: Some("deep-groove".to_owned()),
            brand: None,
            page: Some(0),
        };
        let filter = query.filter();
        assert_eq!(filter.query, None);
        assert_eq!(filter.family_slug.as_deref(), Some("deep-groove"));
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn test_product_detail_lists_known_dimensions() {
        let mut product = fixtures::product(1, "6205-2RS", Decimal::new(1000, 2));
        product.dimensions = Json(Dimensions {
            bore_mm: Some(25.0),
            outer_diameter_mm: Some(52.0),
            width_mm: Some(15.0),
            weight_kg: None,
        });

        let detail = ProductDetail::new(&product, Currency::Ron);
        assert_eq!(detail.dimensions.len(), 3);
        assert_eq!(detail.dimensions[0].value, "25 mm");
        assert_eq!(detail.card.dimensions.as_deref(), Some("25 × 52 × 15 mm"));
        assert!(detail.card.price.ends_with("lei"));
    }
}
