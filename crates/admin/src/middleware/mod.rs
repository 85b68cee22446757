//! HTTP middleware stack for admin.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers (no external scripts, no caching)
//! 4. Session layer (tower-sessions, `admin.session` table)
//!
//! Access control happens per handler through the [`RequireAdmin`] and
//! [`RequireEditor`] extractors.

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAdmin, RequireAdmin, RequireEditor, clear_current_admin, set_current_admin,
};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
