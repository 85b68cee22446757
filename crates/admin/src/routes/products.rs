//! Product route handlers.
//!
//! Products are edited on a single form; images are uploaded one at a time
//! from the edit page and stored in the catalog bucket under
//! `products/{id}/`.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{ProductFamilyId, ProductId};

use crate::db::{FamilyRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::models::{Product, ProductFamily, ProductForm, ProductListRow};
use crate::routes::{Chrome, PAGE_SIZE, Pagination, render, render_invalid, set_flash};
use crate::services::{discard_images, read_image_upload, store_image};
use crate::state::AppState;

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub q: Option<String>,
    /// Family filter; blank means all families.
    pub family: Option<String>,
    pub page: Option<i64>,
}

impl ProductListQuery {
    fn family_id(&self) -> Option<ProductFamilyId> {
        self.family
            .as_deref()
            .and_then(|f| f.trim().parse::<i32>().ok())
            .map(ProductFamilyId::new)
    }
}

/// Image removal form.
#[derive(Debug, Deserialize)]
pub struct ImageForm {
    pub url: String,
}

/// Product list template.
#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub chrome: Chrome,
    pub products: Vec<ProductListRow>,
    pub families: Vec<ProductFamily>,
    pub query: String,
    pub family_id: Option<ProductFamilyId>,
    pub pagination: Pagination,
}

impl ProductsIndexTemplate {
    fn is_family(&self, family: &ProductFamily) -> bool {
        self.family_id == Some(family.id)
    }

    /// Query string for another page, keeping the filters.
    fn page_query(&self, page: i64) -> String {
        let mut query = format!("?page={page}");
        if !self.query.is_empty() {
            query.push_str("&q=");
            query.push_str(&urlencoding::encode(&self.query));
        }
        if let Some(id) = self.family_id {
            query.push_str(&format!("&family={id}"));
        }
        query
    }
}

/// Product create/edit template.
#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub chrome: Chrome,
    /// `None` while creating.
    pub product: Option<Product>,
    pub form: ProductForm,
    pub families: Vec<ProductFamily>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product
            .as_ref()
            .map_or_else(|| "/products".to_owned(), |p| format!("/products/{}", p.id))
    }
}

async fn load_product(state: &AppState, id: i32) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Product list.
///
/// GET /products
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ProductListQuery>,
) -> Result<Html<String>> {
    let family_id = query.family_id();
    let search = query.q.as_deref().map(str::trim).unwrap_or_default();
    let (products, total) = ProductRepository::new(state.pool())
        .list(
            Some(search),
            family_id,
            PAGE_SIZE,
            Pagination::offset_for(query.page),
        )
        .await?;
    let families = FamilyRepository::new(state.pool()).list().await?;

    let template = ProductsIndexTemplate {
        chrome: Chrome::new(&admin, &session, "/products").await?,
        products,
        families,
        query: search.to_owned(),
        family_id,
        pagination: Pagination::new(query.page, total),
    };
    render(&template)
}

/// Empty product form.
///
/// GET /products/new
pub async fn new(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let template = ProductFormTemplate {
        chrome: Chrome::new(&admin, &session, "/products").await?,
        product: None,
        form: ProductForm::new_product(),
        families: FamilyRepository::new(state.pool()).list().await?,
        error: None,
    };
    render(&template)
}

/// Create a product.
///
/// POST /products
#[instrument(skip_all)]
pub async fn create(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let message = match form.validate() {
        Ok(input) => match ProductRepository::new(state.pool()).create(&input).await {
            Ok(product) => {
                set_flash(&session, format!("Created {}", product.part_number)).await?;
                return Ok(Redirect::to(&format!("/products/{}", product.id)).into_response());
            }
            Err(RepositoryError::Conflict(message)) => message,
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    render_invalid(&ProductFormTemplate {
        chrome: Chrome::new(&admin, &session, "/products").await?,
        product: None,
        form,
        families: FamilyRepository::new(state.pool()).list().await?,
        error: Some(message),
    })
}

/// Edit form. Viewers see it read-only.
///
/// GET /products/{id}
#[instrument(skip(admin, state, session))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Html<String>> {
    let product = load_product(&state, id).await?;
    let template = ProductFormTemplate {
        chrome: Chrome::new(&admin, &session, "/products").await?,
        form: ProductForm::from_product(&product),
        product: Some(product),
        families: FamilyRepository::new(state.pool()).list().await?,
        error: None,
    };
    render(&template)
}

/// Save the edit form.
///
/// POST /products/{id}
#[instrument(skip(admin, state, session, form))]
pub async fn update(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product = load_product(&state, id).await?;

    let message = match form.validate() {
        Ok(input) => match ProductRepository::new(state.pool())
            .update(product.id, &input)
            .await
        {
            Ok(()) => {
                set_flash(&session, format!("Saved {}", input.part_number)).await?;
                return Ok(Redirect::to(&format!("/products/{id}")).into_response());
            }
            Err(RepositoryError::Conflict(message)) => message,
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    render_invalid(&ProductFormTemplate {
        chrome: Chrome::new(&admin, &session, "/products").await?,
        product: Some(product),
        form,
        families: FamilyRepository::new(state.pool()).list().await?,
        error: Some(message),
    })
}

/// Activate or deactivate.
///
/// POST /products/{id}/toggle
#[instrument(skip(_admin, state, session))]
pub async fn toggle(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let active = ProductRepository::new(state.pool())
        .toggle_active(ProductId::new(id))
        .await?;
    let message = if active {
        "Product is now visible in the shop"
    } else {
        "Product is now hidden from the shop"
    };
    set_flash(&session, message).await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

/// Delete a product and its stored images.
///
/// POST /products/{id}/delete
#[instrument(skip(_admin, state, session))]
pub async fn delete(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let images = ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;
    discard_images(&state, &images).await;

    tracing::info!(product_id = id, "Deleted product");
    set_flash(&session, "Product deleted").await?;
    Ok(Redirect::to("/products"))
}

/// Upload an image and append it to the gallery.
///
/// POST /products/{id}/images
#[instrument(skip(_admin, state, session, multipart))]
pub async fn upload_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let product = load_product(&state, id).await?;
    let upload = read_image_upload(&mut multipart, state.config().max_upload_bytes).await?;

    let url = store_image(&state, &format!("products/{}", product.id), upload).await?;
    if let Err(e) = ProductRepository::new(state.pool())
        .add_image(product.id, &url)
        .await
    {
        discard_images(&state, &[url]).await;
        return Err(e.into());
    }

    set_flash(&session, "Image uploaded").await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

/// Remove an image from the gallery and the bucket.
///
/// POST /products/{id}/images/remove
#[instrument(skip(_admin, state, session, form))]
pub async fn remove_image(
    RequireEditor(_admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ImageForm>,
) -> Result<Redirect> {
    let product = load_product(&state, id).await?;
    if !product.images.contains(&form.url) {
        return Err(AppError::BadRequest("image does not belong to this product".to_string()));
    }

    ProductRepository::new(state.pool())
        .remove_image(product.id, &form.url)
        .await?;
    discard_images(&state, &[form.url]).await;

    set_flash(&session, "Image removed").await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_filter_ignores_blank() {
        let query = ProductListQuery {
            family: Some(String::new()),
            ..ProductListQuery::default()
        };
        assert_eq!(query.family_id(), None);

        let query = ProductListQuery {
            family: Some("7".to_owned()),
            ..ProductListQuery::default()
        };
        assert_eq!(query.family_id(), Some(ProductFamilyId::new(7)));
    }
}
