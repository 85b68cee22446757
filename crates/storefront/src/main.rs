//! Bearing Shop storefront binary (port 3000 by default).
//!
//! Holds the Supabase anon key, the Stripe secret key and the webhook
//! signing secret. Catalog writes and image uploads belong to the admin
//! binary. Migrations are applied with `bs-cli migrate`, never on start-up.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bearing_shop_storefront::config::StorefrontConfig;
use bearing_shop_storefront::{app, db, state::AppState, telemetry};

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");
    let _telemetry = telemetry::init(&config);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let addr = config.socket_addr();
    let state = AppState::new(config, pool).expect("Failed to initialize application state");
    let feed = state.notifications().clone();
    let listener_task = feed.spawn_listener(&state.config().database_url);
    let router = app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "storefront listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends open SSE streams so connections can drain
            feed.close();
        })
        .await
        .expect("Server error");
    let _ = listener_task.await;
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.expect("Failed to install Ctrl+C handler"),
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");

    tracing::info!("Shutting down");
}
