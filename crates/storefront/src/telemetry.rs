//! Logging, request spans and Sentry set-up for the storefront binary.

use std::time::Duration;

use axum::http::{Request, Response};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StorefrontConfig;

const DEFAULT_FILTER: &str = "bearing_shop_storefront=info,tower_http=debug";

/// How log lines are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT` wins when it names a format; otherwise JSON on Fly.io.
    #[must_use]
    pub fn detect(requested: Option<&str>, on_fly: bool) -> Self {
        match requested.map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => Self::Json,
            Some(f) if f.eq_ignore_ascii_case("text") => Self::Text,
            _ if on_fly => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::detect(
            std::env::var("LOG_FORMAT").ok().as_deref(),
            std::env::var_os("FLY_APP_NAME").is_some(),
        )
    }
}

/// Keeps the Sentry client alive; drop it only at shutdown.
#[must_use = "dropping the guard stops Sentry reporting"]
pub struct Telemetry {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Start Sentry (when a DSN is configured) and install the global subscriber.
///
/// Sentry goes first so the tracing layer has a client to report to.
pub fn init(config: &StorefrontConfig) -> Telemetry {
    let sentry = config.sentry.dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: config.sentry.environment.clone().map(Into::into),
                sample_rate: config.sentry.sample_rate,
                traces_sample_rate: config.sentry.traces_sample_rate,
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let format = LogFormat::from_env();

    tracing_subscriber::registry()
        .with(filter)
        .with((format == LogFormat::Json).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
        }))
        .with((format == LogFormat::Text).then(tracing_subscriber::fmt::layer))
        .with(sentry_tracing::layer().event_filter(sentry_level))
        .init();

    if sentry.is_some() {
        tracing::info!("Sentry initialized");
    }
    Telemetry { _sentry: sentry }
}

fn sentry_level(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Opens one `http_request` span per request; the request ID middleware
/// fills in `request_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}

/// Records status and latency on the request span before the default log line.
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

/// Tracing layer used by [`crate::app`].
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
    fn test_log_format_detection() {
        assert_eq!(LogFormat::detect(None, false), LogFormat::Text);
        assert_eq!(LogFormat::detect(None, true), LogFormat::Json);
        assert_eq!(LogFormat::detect(Some("JSON"), false), LogFormat::Json);
        assert_eq!(LogFormat::detect(Some(" text "), true), LogFormat::Text);
        assert_eq!(LogFormat::detect(Some("pretty"), true), LogFormat::Json);
    }
}
