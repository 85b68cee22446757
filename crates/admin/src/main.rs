//! Bearing Shop admin binary (port 3001 by default).
//!
//! Holds the Supabase service-role key for image uploads. Staff sign in
//! through Supabase Auth and their profile role decides access: `viewer`
//! reads, `admin` edits. Run it on a private network.

#![cfg_attr(not(test), forbid(unsafe_code))]

use bearing_shop_admin::config::AdminConfig;
use bearing_shop_admin::{app, db, state::AppState, telemetry};

#[tokio::main]
async fn main() {
    let config = AdminConfig::from_env().expect("Failed to load configuration");
    let _telemetry = telemetry::init(&config);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    let addr = config.socket_addr();
    let state = AppState::new(config, pool).expect("Failed to initialize application state");
    let router = app(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "admin listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            wait_for_stop().await;
            tracing::info!("Shutting down");
        })
        .await
        .expect("Server error");
}

#[cfg(unix)]
async fn wait_for_stop() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate =
        signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.expect("Failed to install Ctrl+C handler"),
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_stop() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
}
