//! Security headers middleware.
//!
//! Headers start locked down and are loosened only for what the shop needs:
//! Stripe.js and its frames on the payment page, product images from the
//! Supabase storage bucket, and htmx from its CDN.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::CspNonce;
use crate::state::AppState;

const HTMX_ORIGIN: &str = "https://unpkg.com";
const STRIPE_JS_ORIGIN: &str = "https://js.stripe.com";
const STRIPE_API_ORIGIN: &str = "https://api.stripe.com";
const STRIPE_HOOKS_ORIGIN: &str = "https://hooks.stripe.com";

/// Build the Content-Security-Policy value.
///
/// ```text
/// default-src 'none';
/// script-src 'self' 'nonce-…' https://js.stripe.com https://unpkg.com;
/// style-src 'self';
/// img-src 'self' data: <storage origin>;
/// connect-src 'self' https://api.stripe.com;
/// frame-src https://js.stripe.com https://hooks.stripe.com;
/// ...
/// ```
#[must_use]
pub fn content_security_policy(nonce: &CspNonce, image_origin: Option<&str>) -> String {
    let images = image_origin.map_or_else(String::new, |origin| format!(" {origin}"));
    format!(
        "default-src 'none'; \
         script-src 'self' {nonce} {STRIPE_JS_ORIGIN} {HTMX_ORIGIN}; \
         style-src 'self'; \
         font-src 'self'; \
         img-src 'self' data:{images}; \
         connect-src 'self' {STRIPE_API_ORIGIN}; \
         frame-src {STRIPE_JS_ORIGIN} {STRIPE_HOOKS_ORIGIN}; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'; \
         upgrade-insecure-requests",
        nonce = nonce.source(),
    )
}

/// Origin (`scheme://host[:port]`) of a URL, if it parses.
fn origin_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|o| o != "null")
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Stripe needs the origin
/// - `Content-Security-Policy` - Nonce-based, see [`content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features except payment for Stripe
/// - `Strict-Transport-Security` - On HTTPS deployments
/// - `Cross-Origin-Opener-Policy: same-origin-allow-popups` - 3-D Secure popups
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .cloned()
        .unwrap_or_else(CspNonce::generate);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    let image_origin = origin_of(&state.config().supabase.url);
    if let Ok(value) = HeaderValue::from_str(&content_security_policy(&nonce, image_origin.as_deref())) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             midi=(), \
             payment=(self \"https://js.stripe.com\"), \
             usb=(), \
             xr-spatial-tracking=()",
        ),
    );

    if state.config().base_url.starts_with("https://") {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin-allow-popups"),
    );
    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_includes_nonce_and_stripe() {
        let nonce = CspNonce("abc123==".to_owned());
        let csp = content_security_policy(&nonce, Some("https://proj.supabase.co"));

        assert!(csp.contains("script-src 'self' 'nonce-abc123==' https://js.stripe.com"));
        assert!(csp.contains("img-src 'self' data: https://proj.supabase.co;"));
        assert!(csp.contains("frame-src https://js.stripe.com https://hooks.stripe.com;"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://proj.supabase.co/").as_deref(),
            Some("https://proj.supabase.co")
        );
        assert_eq!(
            origin_of("http://localhost:54321").as_deref(),
            Some("http://localhost:54321")
        );
        assert_eq!(origin_of("not a url"), None);
    }
}
