//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (CMS sections, banners, footer)
//! POST /preferences               - Set currency and language
//!
//! # Catalog
//! GET  /products                  - Product listing (?q, family, brand, page)
//! GET  /products/{id}             - Product detail
//! GET  /families                  - Family listing
//! GET  /families/{slug}           - Family detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update               - Update quantity (returns cart_items fragment)
//! POST /cart/remove               - Remove item (returns cart_items fragment)
//! GET  /cart/count                - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Address form and totals
//! POST /checkout                  - Create order and payment intent, show payment form
//! GET  /checkout/complete         - Stripe return URL
//! POST /webhooks/stripe           - Stripe events (signature-verified)
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Account (requires auth)
//! GET  /account                   - Redirects to order history
//! GET  /account/orders            - Order history
//! GET  /account/orders/{id}       - Order detail
//!
//! # Notifications (requires auth)
//! GET  /notifications             - Inbox
//! POST /notifications/{id}/read   - Mark one read
//! POST /notifications/read-all    - Mark all read
//! GET  /notifications/count       - Unread badge (fragment)
//! GET  /notifications/stream      - Unread count (server-sent events)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod families;
pub mod home;
pub mod layout;
pub mod notifications;
pub mod preferences;
pub mod products;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the family routes router.
pub fn family_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(families::index))
        .route("/{slug}", get(families::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/complete", get(checkout::complete))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
}

/// Create the notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::index))
        .route("/{id}/read", post(notifications::mark_read))
        .route("/read-all", post(notifications::mark_all_read))
        .route("/count", get(notifications::count))
        .route("/stream", get(notifications::stream))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/preferences", post(preferences::update))
        .nest("/products", product_routes())
        .nest("/families", family_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/notifications", notification_routes())
        .nest("/auth", auth_routes())
        .route("/webhooks/stripe", post(webhooks::stripe))
}
