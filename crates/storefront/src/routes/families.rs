//! Product family route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::db::{FamilyRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{FamilySummary, ProductFamily};
use crate::routes::layout::Layout;
use crate::routes::products::ProductCard;
use crate::state::AppState;

/// Family listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "families/index.html")]
pub struct FamiliesIndexTemplate {
    pub layout: Layout,
    pub families: Vec<FamilySummary>,
}

/// Family detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "families/show.html")]
pub struct FamilyShowTemplate {
    pub layout: Layout,
    pub family: ProductFamily,
    pub products: Vec<ProductCard>,
}

/// Display all families.
#[instrument(skip(state, layout))]
pub async fn index(State(state): State<AppState>, layout: Layout) -> Result<impl IntoResponse> {
    let families = FamilyRepository::new(state.pool()).list().await?;
    Ok(FamiliesIndexTemplate { layout, families })
}

/// Display a family and its active products.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let family = FamilyRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("family {slug}")))?;

    let products = ProductRepository::new(state.pool())
        .list_by_family(family.id)
        .await?
        .iter()
        .map(|p| ProductCard::new(p, layout.currency))
        .collect();

    Ok(FamilyShowTemplate {
        layout,
        family,
        products,
    })
}
