//! Security headers middleware.
//!
//! The admin panel is plain server-rendered forms, so the policy allows no
//! external scripts at all. Images may come from the storage bucket.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, STRICT_TRANSPORT_SECURITY,
            X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Build the Content-Security-Policy value.
#[must_use]
pub fn content_security_policy(image_origin: Option<&str>) -> String {
    let images = image_origin.map_or_else(String::new, |origin| format!(" {origin}"));
    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         img-src 'self' data:{images}; \
         connect-src 'self'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

fn origin_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .filter(|o| o != "null")
}

/// Add security headers to all responses.
///
/// On top of the storefront's set, admin pages are never cached and never
/// send a referrer.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let image_origin = origin_of(&state.config().supabase.url);
    if let Ok(value) = HeaderValue::from_str(&content_security_policy(image_origin.as_deref())) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=()",
        ),
    );

    if state.config().base_url.starts_with("https://") {
        headers.insert(
            STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_allows_only_self_scripts() {
        let csp = content_security_policy(Some("https://proj.supabase.co"));
        assert!(csp.contains("script-src 'self';"));
        assert!(csp.contains("img-src 'self' data: https://proj.supabase.co;"));
        assert!(!csp.contains("unsafe-inline"));
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://proj.supabase.co/storage").as_deref(),
            Some("https://proj.supabase.co")
        );
        assert_eq!(origin_of("::"), None);
    }
}
