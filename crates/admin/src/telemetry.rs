//! Logging, request spans and Sentry set-up for the admin binary.

use std::time::Duration;

use axum::http::{Request, Response};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AdminConfig;

const DEFAULT_FILTER: &str = "bearing_shop_admin=info,tower_http=debug";

/// JSON when `LOG_FORMAT=json`, or on Fly.io unless `LOG_FORMAT=text`.
fn json_logs(requested: Option<&str>, on_fly: bool) -> bool {
    match requested.map(str::trim) {
        Some(f) if f.eq_ignore_ascii_case("json") => true,
        Some(f) if f.eq_ignore_ascii_case("text") => false,
        _ => on_fly,
    }
}

/// Keeps the Sentry client alive until shutdown.
#[must_use = "dropping the guard stops Sentry reporting"]
pub struct Telemetry {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Start Sentry (when a DSN is configured) and install the global subscriber.
pub fn init(config: &AdminConfig) -> Telemetry {
    let sentry = config.sentry.dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry.environment.clone().map(Into::into),
                sample_rate: config.sentry.sample_rate,
                traces_sample_rate: config.sentry.traces_sample_rate,
                attach_stacktrace: true,
                // Staff addresses are useful on admin error reports
                send_default_pii: true,
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = json_logs(
        std::env::var("LOG_FORMAT").ok().as_deref(),
        std::env::var_os("FLY_APP_NAME").is_some(),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true)))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
            tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
            tracing::Level::INFO | tracing::Level::DEBUG => {
                sentry_tracing::EventFilter::Breadcrumb
            }
            _ => sentry_tracing::EventFilter::Ignore,
        }))
        .init();

    if sentry.is_some() {
        tracing::info!("Sentry initialized");
    }
    Telemetry { _sentry: sentry }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordResponse;

impl<B> OnResponse<B> for RecordResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        span.record("status", response.status().as_u16());
        span.record(
            "latency_ms",
            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        );
        DefaultOnResponse::default().on_response(response, latency, span);
    }
}

/// One `http_request` span per request with status and latency recorded.
#[must_use]
pub fn http_trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    RequestSpan,
    DefaultOnRequest,
    RecordResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(RecordResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_logs_on_fly_unless_overridden() {
        assert!(!json_logs(None, false));
        assert!(json_logs(None, true));
        assert!(json_logs(Some("json"), false));
        assert!(!json_logs(Some("Text"), true));
    }
}
