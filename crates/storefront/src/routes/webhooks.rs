//! Stripe webhook receiver.
//!
//! Payment results arrive here as well as through the customer's return
//! redirect; both paths go through `CheckoutService::apply_payment`, which
//! only marks an order paid once.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::error::AppError;
use crate::routes::checkout::spawn_after_payment;
use crate::services::CheckoutService;
use crate::services::checkout::PaymentOutcome;
use crate::state::AppState;
use crate::stripe::{WebhookEvent, verify_signature};

/// Events that change an order's payment state.
const HANDLED_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.processing",
    "payment_intent.canceled",
];

/// Receive a Stripe event.
///
/// Bad signatures get 400. Database failures get 500 so Stripe retries.
/// Everything else, including events we ignore, is acknowledged with 200.
#[instrument(skip_all)]
pub async fn stripe(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return (StatusCode::BAD_REQUEST, "missing Stripe-Signature").into_response();
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_signature(
        state.config().stripe.webhook_secret.expose_secret(),
        signature,
        &body,
        now,
    ) {
        tracing::warn!(error = %e, "Rejected Stripe webhook");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed Stripe webhook payload");
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");
    if !HANDLED_EVENTS.contains(&event.event_type.as_str()) {
        return StatusCode::OK.into_response();
    }
    let Some(intent) = event.payment_intent() else {
        tracing::warn!(event_id = %event.id, "Payment intent event without a decodable object");
        return StatusCode::OK.into_response();
    };

    let service = CheckoutService::new(state.pool(), state.stripe(), &state.config().checkout);
    match service.apply_payment(&intent).await {
        Ok(Some(PaymentOutcome::Paid {
            order,
            newly_paid: true,
        })) => {
            tracing::info!(order_id = %order.id, "Order paid");
            spawn_after_payment(&state, &order);
        }
        Ok(Some(PaymentOutcome::Failed { order, message })) => {
            tracing::info!(order_id = %order.id, reason = ?message, "Order payment failed");
        }
        Ok(_) => {}
        Err(e) => return AppError::from(e).into_response(),
    }

    StatusCode::OK.into_response()
}
