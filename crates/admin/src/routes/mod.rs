//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Dashboard
//!
//! # Auth (Supabase email + password, viewer or admin profile role)
//! GET  /auth/login                        - Login page
//! POST /auth/login                        - Login action
//! POST /auth/logout                       - Logout action
//!
//! # Catalog
//! GET  /products                          - Product list (?q, family, page)
//! GET  /products/new                      - New product form
//! POST /products                          - Create product
//! GET  /products/{id}                     - Edit product
//! POST /products/{id}                     - Update product
//! POST /products/{id}/toggle              - Activate / deactivate
//! POST /products/{id}/delete              - Delete product and its images
//! POST /products/{id}/images              - Upload image (multipart)
//! POST /products/{id}/images/remove       - Remove image
//! GET  /families ... /families/{id}/images/remove - Same shape as products
//!
//! # Orders
//! GET  /orders                            - Order list (?status, page)
//! GET  /orders/{id}                       - Order detail
//! POST /orders/{id}/status                - Change status / tracking number
//!
//! # Home page content
//! GET  /content                           - Sections
//! POST /content/sections                  - Create section
//! GET  /content/sections/{id}             - Section editor (?locale)
//! POST /content/sections/{id}             - Update heading
//! POST /content/sections/{id}/toggle|move|delete
//! POST /content/sections/{id}/translations - Save heading translation
//! POST /content/sections/{id}/blocks      - Create block
//! GET  /content/blocks/{id}               - Block editor (?locale)
//! POST /content/blocks/{id}               - Save block payload
//! POST /content/blocks/{id}/image         - Upload into an image block (multipart)
//! POST /content/blocks/{id}/toggle|move|delete
//! POST /content/blocks/{id}/translations/{locale}        - Save overlay
//! POST /content/blocks/{id}/translations/{locale}/delete - Drop overlay
//! GET  /content/footer                    - Footer editor (?locale)
//! POST /content/footer/{locale}           - Save footer
//!
//! # Banners
//! GET  /banners                           - Banner list
//! GET  /banners/new, POST /banners        - Create
//! GET  /banners/{id}, POST /banners/{id}  - Edit
//! POST /banners/{id}/image                - Upload image (multipart)
//! POST /banners/{id}/image/remove         - Clear image
//! POST /banners/{id}/move|delete
//! ```
//!
//! GET pages need any staff role; every POST except login needs `admin`.

pub mod auth;
pub mod banners;
pub mod content;
pub mod dashboard;
pub mod families;
pub mod orders;
pub mod products;

use askama::Template;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_sessions::Session;

use bearing_shop_core::ProfileRole;

use crate::error::{AppError, Result};
use crate::models::{CurrentAdmin, keys};
use crate::state::AppState;

/// Highest page number honoured from a query string.
const MAX_PAGE: i64 = 1_000_000;

fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).clamp(1, MAX_PAGE)
}

/// Rows per page on list screens.
pub const PAGE_SIZE: i64 = 25;

/// Multipart overhead allowed on top of the image size limit.
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

// =============================================================================
// Page Chrome
// =============================================================================

/// Signed-in staff member as shown in the navigation.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub email: String,
    pub role: ProfileRole,
    pub can_edit: bool,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            email: admin.email.to_string(),
            role: admin.role,
            can_edit: admin.can_edit(),
        }
    }
}

/// Data every signed-in page shares: who is signed in, which nav item is
/// active, and the one-shot flash message.
#[derive(Debug, Clone)]
pub struct Chrome {
    pub admin: AdminUserView,
    pub current_path: &'static str,
    pub flash: Option<String>,
}

impl Chrome {
    /// Build the chrome, consuming any pending flash message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn new(
        admin: &CurrentAdmin,
        session: &Session,
        current_path: &'static str,
    ) -> Result<Self> {
        Ok(Self {
            admin: AdminUserView::from(admin),
            current_path,
            flash: take_flash(session).await?,
        })
    }

    /// Whether a nav item should be highlighted.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        if path == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(path)
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Queue a message for the next page view.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_flash(session: &Session, message: impl Into<String>) -> Result<()> {
    session.insert(keys::FLASH, message.into()).await?;
    Ok(())
}

async fn take_flash(session: &Session) -> Result<Option<String>> {
    Ok(session.remove::<String>(keys::FLASH).await?)
}

/// Render a template to HTML.
///
/// # Errors
///
/// Returns `AppError::Internal` if rendering fails.
pub fn render(template: &impl Template) -> Result<Html<String>> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("template render error: {e}")))
}

/// Render a form again with its validation error.
///
/// # Errors
///
/// Returns `AppError::Internal` if rendering fails.
pub fn render_invalid(template: &impl Template) -> Result<Response> {
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(template)?).into_response())
}

/// Position in a paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub total: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: Option<i64>, total: i64) -> Self {
        Self {
            page: clamp_page(page),
            total,
        }
    }

    #[must_use]
    pub fn offset_for(page: Option<i64>) -> i64 {
        (clamp_page(page) - 1) * PAGE_SIZE
    }

    #[must_use]
    pub fn pages(&self) -> i64 {
        ((self.total + PAGE_SIZE - 1) / PAGE_SIZE).max(1)
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new))
        .route("/{id}", get(products::edit).post(products::update))
        .route("/{id}/toggle", post(products::toggle))
        .route("/{id}/delete", post(products::delete))
        .route(
            "/{id}/images",
            post(products::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{id}/images/remove", post(products::remove_image))
}

/// Create the product family routes router.
pub fn family_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(families::index).post(families::create))
        .route("/new", get(families::new))
        .route("/{id}", get(families::edit).post(families::update))
        .route("/{id}/delete", post(families::delete))
        .route(
            "/{id}/images",
            post(families::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{id}/images/remove", post(families::remove_image))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::update_status))
}

/// Create the home page content routes router.
pub fn content_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(content::index))
        .route("/sections", post(content::create_section))
        .route(
            "/sections/{id}",
            get(content::edit_section).post(content::update_section),
        )
        .route("/sections/{id}/toggle", post(content::toggle_section))
        .route("/sections/{id}/move", post(content::move_section))
        .route("/sections/{id}/delete", post(content::delete_section))
        .route(
            "/sections/{id}/translations",
            post(content::save_section_translation),
        )
        .route("/sections/{id}/blocks", post(content::create_block))
        .route(
            "/blocks/{id}",
            get(content::edit_block).post(content::update_block),
        )
        .route(
            "/blocks/{id}/image",
            post(content::upload_block_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/blocks/{id}/toggle", post(content::toggle_block))
        .route("/blocks/{id}/move", post(content::move_block))
        .route("/blocks/{id}/delete", post(content::delete_block))
        .route(
            "/blocks/{id}/translations/{locale}",
            post(content::save_block_translation),
        )
        .route(
            "/blocks/{id}/translations/{locale}/delete",
            post(content::delete_block_translation),
        )
        .route("/footer", get(content::edit_footer))
        .route("/footer/{locale}", post(content::save_footer))
}

/// Create the banner routes router.
pub fn banner_routes(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(banners::index).post(banners::create))
        .route("/new", get(banners::new))
        .route("/{id}", get(banners::edit).post(banners::update))
        .route(
            "/{id}/image",
            post(banners::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/{id}/image/remove", post(banners::remove_image))
        .route("/{id}/move", post(banners::move_banner))
        .route("/{id}/delete", post(banners::delete))
}

/// Create all routes for the admin panel.
///
/// `max_upload_bytes` caps image uploads; other bodies keep axum's default
/// limit.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let upload_limit = max_upload_bytes + UPLOAD_OVERHEAD_BYTES;
    Router::new()
        .route("/", get(dashboard::dashboard))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes(upload_limit))
        .nest("/families", family_routes(upload_limit))
        .nest("/orders", order_routes())
        .nest("/content", content_routes(upload_limit))
        .nest("/banners", banner_routes(upload_limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(Some(2), 60);
        assert_eq!(p.pages(), 3);
        assert!(p.has_previous());
        assert!(p.has_next());

        let empty = Pagination::new(None, 0);
        assert_eq!(empty.pages(), 1);
        assert!(!empty.has_previous());
        assert!(!empty.has_next());

        assert_eq!(Pagination::offset_for(Some(3)), 2 * PAGE_SIZE);
        assert_eq!(Pagination::offset_for(Some(-4)), 0);
    }

    #[test]
    fn test_huge_page_is_clamped() {
        let offset = Pagination::offset_for(Some(400_000_000_000_000_000));
        assert_eq!(offset, (MAX_PAGE - 1) * PAGE_SIZE);
        assert_eq!(Pagination::offset_for(Some(i64::MAX)), offset);
        assert_eq!(Pagination::new(Some(i64::MAX), 10).page, MAX_PAGE);
    }
}
