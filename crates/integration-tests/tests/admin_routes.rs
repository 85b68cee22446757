//! Admin router tests that stop short of the database: health checks,
//! access control and the sign-in failure path against a mock Supabase.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bearing_shop_integration_tests::{admin_app, body_text, location, send};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_ok_without_database() {
    let supabase = MockServer::start().await;
    let response = send(admin_app(&supabase.uri()), get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let supabase = MockServer::start().await;
    let response = send(admin_app(&supabase.uri()), get("/health/ready")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Access control
// =============================================================================

#[tokio::test]
async fn test_pages_redirect_to_login_without_session() {
    let supabase = MockServer::start().await;

    for uri in ["/", "/products", "/orders/7", "/content", "/banners/new"] {
        let response = send(admin_app(&supabase.uri()), get(uri)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), Some("/auth/login"), "{uri}");
    }
}

#[tokio::test]
async fn test_changes_redirect_to_login_without_session() {
    let supabase = MockServer::start().await;

    let response = send(
        admin_app(&supabase.uri()),
        post_form("/orders/7/status", "status=shipped&tracking_number=AWB1"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/auth/login"));

    let response = send(
        admin_app(&supabase.uri()),
        post_form("/products/3/delete", ""),
    )
    .await;
    assert_eq!(location(&response), Some("/auth/login"));
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let supabase = MockServer::start().await;
    let response = send(admin_app(&supabase.uri()), get("/auth/login")).await;

    let headers = response.headers();
    assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    assert_eq!(headers.get(header::REFERRER_POLICY).unwrap(), "no-referrer");

    let csp = headers
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("frame-ancestors 'none'"));
    assert!(csp.contains(&supabase.uri()), "bucket origin allowed for images: {csp}");

    // Plain HTTP base URL in tests
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

// =============================================================================
// Sign-in
// =============================================================================

#[tokio::test]
async fn test_login_page_renders() {
    let supabase = MockServer::start().await;
    let response = send(
        admin_app(&supabase.uri()),
        get("/auth/login?error=forbidden"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("action=\"/auth/login\""));
    assert!(html.contains("does not have access to the admin panel"));
}

#[tokio::test]
async fn test_rejected_credentials_return_to_login() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .expect(1)
        .mount(&supabase)
        .await;

    let response = send(
        admin_app(&supabase.uri()),
        post_form("/auth/login", "email=staff%40example.com&password=wrong"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/auth/login?error=credentials"));
    assert!(
        response.headers().get(header::SET_COOKIE).is_none(),
        "no session for a refused sign-in"
    );
}

#[tokio::test]
async fn test_supabase_outage_is_a_server_error() {
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&supabase)
        .await;

    let response = send(
        admin_app(&supabase.uri()),
        post_form("/auth/login", "email=staff%40example.com&password=secret"),
    )
    .await;

    assert!(response.status().is_server_error());
}
