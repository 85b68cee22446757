//! Currency and language picker.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{Currency, Locale};

use crate::db::UserSettingsRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, Preferences};
use crate::models::keys;
use crate::routes::layout::safe_return_path;
use crate::state::AppState;

/// Preference form data. Missing fields keep the current value.
#[derive(Debug, Deserialize)]
pub struct PreferencesForm {
    pub currency: Option<String>,
    pub locale: Option<String>,
    pub return_to: Option<String>,
}

/// Store the chosen currency and locale, then go back to the page the
/// picker was on.
#[instrument(skip(state, session, user, current))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    current: Preferences,
    Form(form): Form<PreferencesForm>,
) -> Result<impl IntoResponse> {
    let currency = match form.currency.as_deref().filter(|s| !s.is_empty()) {
        Some(code) => code
            .parse::<Currency>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        None => current.currency,
    };
    let locale = match form.locale.as_deref().filter(|s| !s.is_empty()) {
        Some(tag) => Locale::parse(tag)
            .ok()
            .filter(|l| state.config().supported_locales.contains(l))
            .ok_or_else(|| AppError::BadRequest(format!("unsupported language: {tag}")))?,
        None => current.locale,
    };

    session.insert(keys::CURRENCY, currency).await?;
    session.insert(keys::LOCALE, &locale).await?;

    if let Some(user) = &user
        && let Err(e) = UserSettingsRepository::new(state.pool())
            .save_preferences(user.id, currency, &locale)
            .await
    {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to store preferences");
    }

    Ok(Redirect::to(safe_return_path(form.return_to.as_deref())))
}
