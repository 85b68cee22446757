//! Checkout and payment route handlers.
//!
//! The flow is: address form, order + payment intent creation, the Stripe
//! Payment Element on the payment page, then Stripe's redirect back to
//! `/checkout/complete`. The webhook applies the same payment result for
//! customers who never come back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::Cart;
use bearing_shop_core::order::ShippingAddress;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Order};
use crate::routes::cart::{CartView, load_cart, store_cart};
use crate::routes::layout::Layout;
use crate::services::checkout::{PaymentOutcome, after_payment};
use crate::services::email::OrderSummary;
use crate::services::{CheckoutError, CheckoutService, PlacedOrder};
use crate::state::AppState;

/// Link to an order in the customer's account.
#[must_use]
pub fn order_url(state: &AppState, order: &Order) -> String {
    state
        .config()
        .absolute_url(&format!("/account/orders/{}", order.id))
}

// =============================================================================
// Form Types
// =============================================================================

/// Shipping details form data.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
    pub notes: Option<String>,
}

impl CheckoutForm {
    fn address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            company: self.company.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Stripe's return URL parameters.
#[derive(Debug, Deserialize)]
pub struct CompleteQuery {
    pub payment_intent: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Address and order review page.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub address: ShippingAddress,
    pub notes: String,
    pub error: Option<String>,
    /// Lines dropped because the product is no longer sold.
    pub removed: usize,
}

/// Payment page hosting the Stripe Payment Element.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub order_number: String,
    pub total: String,
    pub client_secret: String,
    pub publishable_key: String,
    pub return_url: String,
}

/// Result page after Stripe redirects back.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CompleteTemplate {
    pub layout: Layout,
    /// `paid`, `pending` or `failed`.
    pub outcome: &'static str,
    pub order_id: i32,
    pub order_number: String,
    pub total: String,
    pub message: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Re-price the session cart, saving it back when lines were dropped.
async fn repriced_cart(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
) -> Result<(Cart, usize)> {
    let mut cart = load_cart(session).await;
    let dropped = checkout_service(state).reprice(&mut cart).await?;
    if !dropped.is_empty() {
        store_cart(state, session, Some(user), &cart).await?;
    }
    Ok((cart, dropped.len()))
}

fn checkout_service(state: &AppState) -> CheckoutService<'_> {
    CheckoutService::new(state.pool(), state.stripe(), &state.config().checkout)
}

/// Display the checkout form.
#[instrument(skip(state, session, user, layout))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    layout: Layout,
) -> Result<Response> {
    let (cart, removed) = repriced_cart(&state, &session, &user).await?;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let profile = ProfileRepository::new(state.pool()).get(user.id).await?;
    let address = profile.map_or_else(ShippingAddress::default, |p| ShippingAddress {
        full_name: p.full_name.unwrap_or_default(),
        company: p.company.unwrap_or_default(),
        phone: p.phone.unwrap_or_default(),
        ..ShippingAddress::default()
    });

    Ok(CheckoutTemplate {
        cart: CartView::new(&cart, &state.config().checkout, layout.currency),
        address,
        notes: String::new(),
        error: None,
        removed,
        layout,
    }
    .into_response())
}

/// Create the order and payment intent, then show the payment form.
#[instrument(skip(state, session, user, layout, form))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    layout: Layout,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let (cart, removed) = repriced_cart(&state, &session, &user).await?;

    let placed = checkout_service(&state)
        .place_order(
            &user,
            &cart,
            form.address(),
            layout.currency,
            form.notes.clone(),
        )
        .await;

    let PlacedOrder {
        order,
        items,
        client_secret,
    } = match placed {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => return Ok(Redirect::to("/cart").into_response()),
        Err(err @ CheckoutError::MissingAddress(_)) => {
            let error = Some(format!("Please fill in the {}.", err_fields(&err)));
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutTemplate {
                    cart: CartView::new(&cart, &state.config().checkout, layout.currency),
                    address: form.address(),
                    notes: form.notes.unwrap_or_default(),
                    error,
                    removed,
                    layout,
                },
            )
                .into_response());
        }
        Err(e) => return Err(AppError::from(e)),
    };

    crate::error::add_breadcrumb(
        "checkout",
        "Order placed",
        &[("order_number", order.number().as_str())],
    );

    if let Some(email) = state.email().cloned() {
        let summary = OrderSummary::new(&order, &items, order_url(&state, &order));
        let to = order.email.clone();
        tokio::spawn(async move {
            if let Err(e) = email.send_order_confirmation(&to, &summary).await {
                tracing::error!(order_number = %summary.order_number, error = %e, "Failed to send order confirmation");
            }
        });
    }

    Ok(PaymentTemplate {
        order_number: order.number(),
        total: order.total_money().display(),
        client_secret,
        publishable_key: state.config().stripe.publishable_key.clone(),
        return_url: state.config().absolute_url("/checkout/complete"),
        layout,
    }
    .into_response())
}

/// Human-readable list of the missing address fields.
fn err_fields(err: &CheckoutError) -> String {
    match err {
        CheckoutError::MissingAddress(fields) => fields
            .iter()
            .map(|f| f.replace('_', " ").replace("line1", "address"))
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

/// Handle Stripe's redirect after the Payment Element confirms.
#[instrument(skip(state, session, user, layout))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut layout: Layout,
    Query(query): Query<CompleteQuery>,
) -> Result<Response> {
    let intent_id = query
        .payment_intent
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing payment_intent".to_owned()))?;

    let intent = state.stripe().retrieve_payment_intent(&intent_id).await?;
    let outcome = checkout_service(&state)
        .apply_payment(&intent)
        .await?
        .ok_or_else(|| AppError::NotFound("order for payment".to_owned()))?;

    if outcome.order().user_id != user.id {
        return Err(AppError::NotFound(format!("order {}", outcome.order().id)));
    }

    let (order, status, message) = match outcome {
        PaymentOutcome::Paid { order, newly_paid } => {
            store_cart(&state, &session, Some(&user), &Cart::new()).await?;
            layout.cart_count = 0;
            if newly_paid {
                spawn_after_payment(&state, &order);
            }
            (order, "paid", None)
        }
        PaymentOutcome::Pending { order } => (order, "pending", None),
        PaymentOutcome::Failed { order, message } => (order, "failed", message),
    };

    Ok(CompleteTemplate {
        outcome: status,
        order_id: order.id.as_i32(),
        order_number: order.number(),
        total: order.total_money().display(),
        message,
        layout,
    }
    .into_response())
}

/// Run the paid-order side effects without holding up the response.
pub fn spawn_after_payment(state: &AppState, order: &Order) {
    let pool = state.pool().clone();
    let email = state.email().cloned();
    let url = order_url(state, order);
    let order = order.clone();
    tokio::spawn(async move {
        after_payment(&pool, email.as_ref(), &order, url).await;
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_readable() {
        let err = CheckoutError::MissingAddress(vec!["full_name", "line1", "postal_code"]);
        assert_eq!(err_fields(&err), "full name, address, postal code");
    }

    #[test]
    fn test_form_maps_to_address() {
        let form = CheckoutForm {
            full_name: "Ana Pop".to_owned(),
            city: "Brasov".to_owned(),
            ..CheckoutForm::default()
        };
        let address = form.address();
        assert_eq!(address.full_name, "Ana Pop");
        assert_eq!(address.city, "Brasov");
        assert!(address.missing_fields().contains(&"line1"));
    }
}
