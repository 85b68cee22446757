//! Values every full page needs for the shared header and footer.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bearing_shop_core::{Cart, Currency, Locale};

use crate::middleware::{CspNonce, OptionalAuth, Preferences};
use crate::models::{CurrentUser, keys};
use crate::state::AppState;

/// Header state: who is signed in, the cart badge and the preference pickers.
#[derive(Debug, Clone)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub currency: Currency,
    pub locale: Locale,
    pub locales: Vec<Locale>,
    pub currencies: [Currency; 4],
    pub nonce: String,
    /// Path and query of the current page, posted back by the preference form.
    pub path: String,
}

impl Layout {
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn user_email(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.email.as_str())
    }

    #[must_use]
    pub fn is_currency(&self, currency: &Currency) -> bool {
        self.currency == *currency
    }

    #[must_use]
    pub fn is_locale(&self, locale: &Locale) -> bool {
        self.locale == *locale
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        let prefs = Preferences::from_request_parts(parts, state).await?;
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state).await?;

        let cart_count = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<Cart>(keys::CART)
                .await
                .ok()
                .flatten()
                .map_or(0, |cart| cart.item_count()),
            None => 0,
        };

        Ok(Self {
            user,
            cart_count,
            currency: prefs.currency,
            locale: prefs.locale,
            locales: state.config().supported_locales.clone(),
            currencies: Currency::ALL,
            nonce,
            path: parts
                .uri
                .path_and_query()
                .map_or_else(|| "/".to_owned(), |pq| pq.as_str().to_owned()),
        })
    }
}

/// Accept only local paths as redirect targets.
#[must_use]
pub fn safe_return_path(target: Option<&str>) -> &str {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_return_path_rejects_external_targets() {
        assert_eq!(safe_return_path(Some("/products?q=6205")), "/products?q=6205");
        assert_eq!(safe_return_path(Some("//evil.test/")), "/");
        assert_eq!(safe_return_path(Some("https://evil.test/")), "/");
        assert_eq!(safe_return_path(Some("/\\evil.test")), "/");
        assert_eq!(safe_return_path(None), "/");
    }
}
