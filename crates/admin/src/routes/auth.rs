//! Authentication route handlers for admin.
//!
//! Staff sign in with the same Supabase email and password as the
//! storefront. Only profiles with the `viewer` or `admin` role get a
//! session; everyone else is sent back to the login page.

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{Email, UserId};
use bearing_shop_supabase::AuthError;

use crate::db::ProfileRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAdmin, clear_current_admin, set_current_admin};
use crate::models::{CurrentAdmin, keys};
use crate::routes::render;
use crate::state::AppState;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// `?error=` on the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
}

/// User-facing text for an error code carried in the query string.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "forbidden" => "This account does not have access to the admin panel.",
        "session" => "We could not start your session. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<&'static str>,
}

/// Render the login page.
///
/// GET /auth/login
pub async fn login_page(
    OptionalAdmin(admin): OptionalAdmin,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    if admin.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let template = LoginTemplate {
        error: query.error.as_deref().map(error_message),
    };
    Ok(render(&template)?.into_response())
}

/// Sign in and check the profile role.
///
/// POST /auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let email = form.email.trim().to_owned();
    let password = SecretString::from(form.password);

    let auth = match state.auth().sign_in_with_password(&email, &password).await {
        Ok(auth) => auth,
        Err(AuthError::Rejected(reason)) => {
            tracing::info!(reason = %reason, "Admin login rejected");
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let user_id = UserId::new(auth.user.id);
    let profile = ProfileRepository::new(state.pool()).get(user_id).await?;
    let Some(profile) = profile.filter(|p| p.role.can_access_admin()) else {
        tracing::warn!(user_id = %user_id, "Sign-in without admin role");
        if let Err(e) = state.auth().sign_out(&auth.access_token).await {
            tracing::warn!(error = %e, "Failed to revoke token of refused sign-in");
        }
        return Ok(Redirect::to("/auth/login?error=forbidden").into_response());
    };

    let email = Email::parse(auth.user.email.as_deref().unwrap_or(&profile.email))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let admin = CurrentAdmin {
        id: user_id,
        email,
        role: profile.role,
    };

    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!(error = %e, "Failed to store admin session");
        return Ok(Redirect::to("/auth/login?error=session").into_response());
    }
    session.insert(keys::ACCESS_TOKEN, &auth.access_token).await?;
    set_sentry_user(&admin.id, Some(admin.email.as_str()));

    tracing::info!(user_id = %admin.id, role = %admin.role, "Staff signed in");
    Ok(Redirect::to("/").into_response())
}

/// Revoke the Supabase token and clear the session.
///
/// POST /auth/logout
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    let token: Option<String> = session.get(keys::ACCESS_TOKEN).await.ok().flatten();
    if let Some(token) = token
        && let Err(e) = state.auth().sign_out(&token).await
    {
        tracing::warn!(error = %e, "Failed to revoke access token");
    }

    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(error_message("credentials"), "Invalid email or password.");
        assert!(error_message("forbidden").contains("admin panel"));
        assert_eq!(
            error_message("whatever"),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_login_page_renders_error() {
        let html = LoginTemplate {
            error: Some(error_message("forbidden")),
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("does not have access"));
        assert!(html.contains("action=\"/auth/login\""));
    }
}
