//! Visitor display preferences: currency and content locale.

use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use tower_sessions::Session;

use bearing_shop_core::{Currency, Locale};

use crate::models::keys;
use crate::state::AppState;

/// The currency and locale a request should be rendered in.
///
/// Resolution order for the locale: session choice, `Accept-Language`
/// (first supported tag), then the configured default. The currency comes
/// from the session, defaulting to the base currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub currency: Currency,
    pub locale: Locale,
}

impl Preferences {
    /// Pick a locale without a session choice.
    #[must_use]
    pub fn negotiate_locale(
        accept_language: Option<&str>,
        supported: &[Locale],
        default: &Locale,
    ) -> Locale {
        accept_language
            .and_then(|header| Locale::from_accept_language(header, supported))
            .unwrap_or_else(|| default.clone())
    }
}

impl FromRequestParts<AppState> for Preferences {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();
        let session = parts.extensions.get::<Session>();

        let (stored_currency, stored_locale) = match session {
            Some(session) => (
                session.get::<Currency>(keys::CURRENCY).await.ok().flatten(),
                session.get::<Locale>(keys::LOCALE).await.ok().flatten(),
            ),
            None => (None, None),
        };

        let locale = stored_locale
            .filter(|l| config.supported_locales.contains(l))
            .unwrap_or_else(|| {
                Self::negotiate_locale(
                    parts
                        .headers
                        .get(ACCEPT_LANGUAGE)
                        .and_then(|v| v.to_str().ok()),
                    &config.supported_locales,
                    &config.default_locale,
                )
            });

        Ok(Self {
            currency: stored_currency.unwrap_or_default(),
            locale,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn supported() -> Vec<Locale> {
        vec![Locale::parse("en").unwrap(), Locale::parse("ro").unwrap()]
    }

    #[test]
    fn test_negotiate_prefers_accept_language() {
        let locale = Preferences::negotiate_locale(
            Some("ro-RO,ro;q=0.9,en;q=0.8"),
            &supported(),
            &Locale::default(),
        );
        assert_eq!(locale.as_str(), "ro");
    }

    #[test]
    fn test_negotiate_falls_back_to_default() {
        let default = Locale::parse("en").unwrap();
        assert_eq!(
            Preferences::negotiate_locale(Some("de-DE,de;q=0.9"), &supported(), &default),
            default
        );
        assert_eq!(
            Preferences::negotiate_locale(None, &supported(), &default),
            default
        );
    }
}
