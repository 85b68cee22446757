//! Cart route handlers.
//!
//! The cart lives in the session. For signed-in customers every change is
//! also written to `user_settings.cart` so it follows them across devices.
//! Mutations answer with HTMX fragments and an `HX-Trigger: cart-updated`
//! header so the header badge refreshes itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{Cart, CheckoutPolicy, CheckoutTotals, Currency, Money, ProductId};

use crate::db::{ProductRepository, UserSettingsRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, Preferences};
use crate::models::{CurrentUser, keys};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub part_number: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
}

/// Formatted checkout totals.
#[derive(Clone)]
pub struct TotalsView {
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
}

impl From<&CheckoutTotals> for TotalsView {
    fn from(totals: &CheckoutTotals) -> Self {
        Self {
            subtotal: totals.subtotal_money().display(),
            shipping: totals.shipping_money().display(),
            tax: totals.tax_money().display(),
            total: totals.total_money().display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub totals: TotalsView,
}

impl CartView {
    /// Render `cart` in `currency` with shipping and tax from `policy`.
    #[must_use]
    pub fn new(cart: &Cart, policy: &CheckoutPolicy, currency: Currency) -> Self {
        let display = |amount| Money::new(amount, currency).display();
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartItemView {
                    id: item.id.as_i32(),
                    part_number: item.part_number.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price: display(item.unit_price_in(currency)),
                    line_price: display(item.line_total_in(currency)),
                    image: item.image.clone(),
                })
                .collect(),
            item_count: cart.item_count(),
            totals: TotalsView::from(&CheckoutTotals::compute(cart, policy, currency)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Save the cart in the session and mirror it for a signed-in customer.
///
/// A failed mirror write is logged; the session copy is authoritative.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn store_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
    cart: &Cart,
) -> Result<()> {
    session.insert(keys::CART, cart).await?;

    if let Some(user) = user
        && let Err(e) = UserSettingsRepository::new(state.pool())
            .save_cart(user.id, cart)
            .await
    {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to mirror cart");
    }
    Ok(())
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i32,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, layout))]
pub async fn show(State(state): State<AppState>, session: Session, layout: Layout) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    CartShowTemplate {
        cart: CartView::new(&cart, &state.config().checkout, layout.currency),
        layout,
    }
}

/// Add a product to the cart.
///
/// HTMX requests get the count badge back; plain form posts are redirected
/// to the cart page.
#[instrument(skip(state, session, headers, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = ProductRepository::new(state.pool())
        .get_active(ProductId::new(form.product_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", form.product_id)))?;

    let quantity = form.quantity.unwrap_or(1).clamp(1, Cart::MAX_QUANTITY);
    let mut cart = load_cart(&session).await;
    cart.add(product.to_cart_item(quantity));
    store_cart(&state, &session, user.as_ref(), &cart).await?;

    if !is_htmx(&headers) {
        return Ok(Redirect::to("/cart").into_response());
    }
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Update cart item quantity (HTMX). Zero removes the line.
#[instrument(skip(state, session, user, prefs))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    prefs: Preferences,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    let quantity = form.quantity.min(Cart::MAX_QUANTITY);
    if cart.set_quantity(ProductId::new(form.product_id), quantity) {
        store_cart(&state, &session, user.as_ref(), &cart).await?;
    }

    Ok(fragment(&state, &cart, prefs.currency))
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session, user, prefs))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    prefs: Preferences,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    if cart.remove(ProductId::new(form.product_id)) {
        store_cart(&state, &session, user.as_ref(), &cart).await?;
    }

    Ok(fragment(&state, &cart, prefs.currency))
}

fn fragment(state: &AppState, cart: &Cart, currency: Currency) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::new(cart, &state.config().checkout, currency),
        },
    )
        .into_response()
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bearing_shop_core::CartItem;
    use rust_decimal::Decimal;

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem {
            id: ProductId::new(7),
            part_number: "6205-2RS".to_owned(),
            name: "Deep groove ball bearing".to_owned(),
            price: Decimal::new(1250, 2),
            quantity: 2,
            image: None,
        });
        cart.add(CartItem {
            id: ProductId::new(9),
            part_number: "NU 206".to_owned(),
            name: "Cylindrical roller bearing".to_owned(),
            price: Decimal::new(4000, 2),
            quantity: 1,
            image: None,
        });
        cart
    }

    #[test]
    fn test_cart_view_totals_add_up() {
        let view = CartView::new(&cart(), &CheckoutPolicy::default(), Currency::Eur);

        assert_eq!(view.item_count, 3);
        assert_eq!(view.items[0].line_price, "€25.00");
        // 65.00 goods + 25.00 shipping + 12.35 tax
        assert_eq!(view.totals.subtotal, "€65.00");
        assert_eq!(view.totals.shipping, "€25.00");
        assert_eq!(view.totals.tax, "€12.35");
        assert_eq!(view.totals.total, "€102.35");
    }

    #[test]
    fn test_cart_view_lines_use_converted_unit_price() {
        let mut cart = Cart::new();
        cart.add(CartItem {
            id: ProductId::new(3),
            part_number: "22210 E".to_owned(),
            name: "Spherical roller bearing".to_owned(),
            price: Decimal::new(1005, 2),
            quantity: 10,
            image: None,
        });
        let view = CartView::new(&cart, &CheckoutPolicy::default(), Currency::Usd);

        assert_eq!(view.items[0].price, "$10.85");
        assert_eq!(view.items[0].line_price, "$108.50");
        assert_eq!(view.totals.subtotal, "$108.50");
    }

    #[test]
    fn test_empty_cart_view_has_zero_totals() {
        let view = CartView::new(&Cart::new(), &CheckoutPolicy::default(), Currency::Eur);
        assert!(view.is_empty());
        assert_eq!(view.totals.total, "€0.00");
    }

    #[test]
    fn test_htmx_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_htmx(&headers));
        headers.insert("hx-request", "true".parse().unwrap());
        assert!(is_htmx(&headers));
    }
}
