//! Storefront router tests that stop short of the database: health checks,
//! the request ID, customer-only fragments and Stripe webhook verification.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use wiremock::MockServer;

use bearing_shop_integration_tests::{WEBHOOK_SECRET, body_text, send, storefront_app};
use bearing_shop_storefront::stripe::webhook::compute_signature;

struct Mocks {
    supabase: MockServer,
    stripe: MockServer,
}

impl Mocks {
    async fn start() -> Self {
        Self {
            supabase: MockServer::start().await,
            stripe: MockServer::start().await,
        }
    }

    fn app(&self) -> axum::Router {
        storefront_app(&self.supabase.uri(), &self.stripe.uri())
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn webhook(body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/stripe")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

fn signed(body: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let timestamp = i64::try_from(now).unwrap();
    let signature = compute_signature(WEBHOOK_SECRET, timestamp, body.as_bytes()).unwrap();
    format!("t={timestamp},v1={signature}")
}

// =============================================================================
// Health and request IDs
// =============================================================================

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let mocks = Mocks::start().await;
    let response = send(mocks.app(), get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let mocks = Mocks::start().await;
    let response = send(mocks.app(), get("/health/ready")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_upstream_request_id_is_echoed() {
    let mocks = Mocks::start().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-42")
        .body(Body::empty())
        .unwrap();
    let response = send(mocks.app(), request).await;

    assert_eq!(response.headers().get("x-request-id").unwrap(), "edge-42");
    assert_eq!(response.headers().get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
}

// =============================================================================
// Customer pages
// =============================================================================

#[tokio::test]
async fn test_account_fragment_requires_sign_in() {
    let mocks = Mocks::start().await;
    for uri in ["/account", "/account/orders", "/notifications"] {
        let request = Request::builder()
            .uri(uri)
            .header("hx-request", "true")
            .body(Body::empty())
            .unwrap();
        let response = send(mocks.app(), request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

// =============================================================================
// Stripe webhooks
// =============================================================================

#[tokio::test]
async fn test_webhook_without_signature_is_rejected() {
    let mocks = Mocks::start().await;
    let response = send(mocks.app(), webhook("{}", None)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "missing Stripe-Signature");
}

#[tokio::test]
async fn test_webhook_with_wrong_signature_is_rejected() {
    let mocks = Mocks::start().await;
    let body = r#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{}}}"#;
    let forged = signed(r#"{"id":"evt_1","type":"customer.created","data":{"object":{}}}"#);

    let response = send(mocks.app(), webhook(body, Some(forged))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "invalid signature");
}

#[tokio::test]
async fn test_signed_webhook_with_malformed_payload_is_rejected() {
    let mocks = Mocks::start().await;
    let body = r#"{"id":"evt_2"}"#;

    let response = send(mocks.app(), webhook(body, Some(signed(body)))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unhandled_event_types_are_acknowledged() {
    let mocks = Mocks::start().await;
    let body = r#"{"id":"evt_3","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;

    let response = send(mocks.app(), webhook(body, Some(signed(body)))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_payment_event_without_intent_is_acknowledged() {
    let mocks = Mocks::start().await;
    let body = r#"{"id":"evt_4","type":"payment_intent.succeeded","data":{"object":"not an intent"}}"#;

    let response = send(mocks.app(), webhook(body, Some(signed(body)))).await;

    assert_eq!(response.status(), StatusCode::OK);
}
