//! Authentication route handlers.
//!
//! Customers sign in with email and password against Supabase Auth. On
//! success the profile row is created or refreshed, the identity goes into
//! the session, and the cart saved from earlier visits is merged in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{Currency, Email, Locale, UserId};
use bearing_shop_supabase::{AuthError, AuthSession, SignUpOutcome};

use crate::db::{ProfileRepository, UserSettingsRepository};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, keys};
use crate::routes::cart::{load_cart, store_cart};
use crate::routes::layout::{Layout, safe_return_path};
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// User-facing text for an error code carried in the query string.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "email" => "Please enter a valid email address.",
        "password_mismatch" => "The passwords do not match.",
        "password_too_short" => "Passwords must be at least 8 characters long.",
        "rejected" => "That email cannot be registered. Try signing in instead.",
        "session" => "We could not start your session. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub error: Option<&'static str>,
}

/// Shown when Supabase requires the email to be confirmed first.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub layout: Layout,
    pub email: String,
}

// =============================================================================
// Session Setup
// =============================================================================

/// Store the signed-in customer and restore their saved cart and settings.
///
/// Returns where to send the customer next.
async fn establish_session(
    state: &AppState,
    session: &Session,
    auth: AuthSession,
    fallback_email: &str,
) -> Result<String> {
    let email = Email::parse(auth.user.email.as_deref().unwrap_or(fallback_email))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let user_id = UserId::new(auth.user.id);

    let profile = ProfileRepository::new(state.pool())
        .upsert(user_id, &email)
        .await?;
    let user = CurrentUser {
        id: user_id,
        email,
        role: profile.role,
    };

    set_current_user(session, &user).await?;
    session.insert(keys::ACCESS_TOKEN, &auth.access_token).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let mut cart = load_cart(session).await;
    match UserSettingsRepository::new(state.pool()).get(user.id).await {
        Ok(Some(settings)) => {
            cart.merge_stored(settings.cart);
            if session.get::<Currency>(keys::CURRENCY).await?.is_none() {
                session.insert(keys::CURRENCY, settings.currency).await?;
            }
            if let Some(locale) = settings.locale
                && session.get::<Locale>(keys::LOCALE).await?.is_none()
            {
                session.insert(keys::LOCALE, locale).await?;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Failed to load stored settings"),
    }
    store_cart(state, session, Some(&user), &cart).await?;

    tracing::info!(user_id = %user.id, "Customer signed in");

    let return_to: Option<String> = session.remove(keys::RETURN_TO).await?;
    Ok(safe_return_path(return_to.as_deref()).to_owned())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    layout: Layout,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account/orders").into_response();
    }
    LoginTemplate {
        layout,
        error: query.error.as_deref().map(error_message),
        success: query.success,
    }
    .into_response()
}

/// Handle login form submission.
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
            tracing::info!(reason = %reason, "Login rejected");
            return Ok(Redirect::to("/auth/login?error=credentials").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let next = establish_session(&state, &session, auth, &email).await?;
    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        error: query.error.as_deref().map(error_message),
    }
}

/// Check registration input before calling Supabase. Returns an error code.
fn validate_registration(form: &RegisterForm) -> std::result::Result<Email, &'static str> {
    let email = Email::parse(&form.email).map_err(|_| "email")?;
    if form.password != form.password_confirm {
        return Err("password_mismatch");
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("password_too_short");
    }
    Ok(email)
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    layout: Layout,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let email = match validate_registration(&form) {
        Ok(email) => email,
        Err(code) => return Ok(Redirect::to(&format!("/auth/register?error={code}")).into_response()),
    };
    let password = SecretString::from(form.password);

    match state.auth().sign_up(email.as_str(), &password).await {
        Ok(SignUpOutcome::SignedIn(auth)) => {
            let next = establish_session(&state, &session, auth, email.as_str()).await?;
            Ok(Redirect::to(&next).into_response())
        }
        Ok(SignUpOutcome::ConfirmationRequired(_)) => Ok(RegisterSuccessTemplate {
            layout,
            email: email.to_string(),
        }
        .into_response()),
        Err(AuthError::Rejected(reason)) => {
            tracing::info!(reason = %reason, "Registration rejected");
            Ok(Redirect::to("/auth/register?error=rejected").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Revoke the Supabase session and clear ours.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let token: Option<String> = session.get(keys::ACCESS_TOKEN).await?;
    if let Some(token) = token
        && let Err(e) = state.auth().sign_out(&token).await
    {
        tracing::warn!(error = %e, "Failed to revoke Supabase session");
    }

    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            email: email.to_owned(),
            password: password.to_owned(),
            password_confirm: confirm.to_owned(),
        }
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration(&form("ana@example.com", "correct horse", "correct horse")).is_ok());
        assert_eq!(
            validate_registration(&form("not-an-email", "correct horse", "correct horse")).err(),
            Some("email")
        );
        assert_eq!(
            validate_registration(&form("ana@example.com", "correct horse", "correct horsy")).err(),
            Some("password_mismatch")
        );
        assert_eq!(
            validate_registration(&form("ana@example.com", "short", "short")).err(),
            Some("password_too_short")
        );
    }

    #[test]
    fn test_unknown_error_codes_get_generic_text() {
        assert_eq!(error_message("credentials"), "Invalid email or password.");
        assert_eq!(
            error_message("<script>"),
            "Something went wrong. Please try again."
        );
    }
}
