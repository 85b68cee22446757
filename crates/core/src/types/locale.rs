//! Content locale.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Locale`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocaleError {
    #[error("locale must be a two-letter language code with an optional -XX region")]
    Malformed,
}

/// A locale tag such as `en`, `ro` or `en-GB`.
///
/// The language part is stored lowercase and the region uppercase, so tags
/// compare equal regardless of the casing they arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Tag of the default locale.
    pub const DEFAULT_TAG: &'static str = "en";

    /// The default locale (`en`).
    #[must_use]
    pub fn default_locale() -> Self {
        Self(Self::DEFAULT_TAG.to_owned())
    }

    /// Parse a locale tag. Accepts `_` as the region separator.
    ///
    /// # Errors
    ///
    /// Returns [`LocaleError::Malformed`] unless the input is a two-letter
    /// language code optionally followed by a two-letter region.
    pub fn parse(s: &str) -> Result<Self, LocaleError> {
        let s = s.trim().replace('_', "-");
        let (lang, region) = match s.split_once('-') {
            Some((lang, region)) => (lang, Some(region)),
            None => (s.as_str(), None),
        };

        let is_alpha2 = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_alphabetic());
        if !is_alpha2(lang) {
            return Err(LocaleError::Malformed);
        }

        match region {
            None => Ok(Self(lang.to_ascii_lowercase())),
            Some(r) if is_alpha2(r) => Ok(Self(format!(
                "{}-{}",
                lang.to_ascii_lowercase(),
                r.to_ascii_uppercase()
            ))),
            Some(_) => Err(LocaleError::Malformed),
        }
    }

    /// Pick the first tag of an `Accept-Language` header that is supported.
    ///
    /// A tag matches when either the full tag or its language is in
    /// `supported`. Quality values are honored; ties keep header order.
    #[must_use]
    pub fn from_accept_language(header: &str, supported: &[Self]) -> Option<Self> {
        let mut candidates: Vec<(f32, usize, &str)> = header
            .split(',')
            .enumerate()
            .filter_map(|(idx, part)| {
                let mut pieces = part.split(';');
                let tag = pieces.next()?.trim();
                let quality = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                (!tag.is_empty() && quality > 0.0).then_some((quality, idx, tag))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        candidates.into_iter().find_map(|(_, _, tag)| {
            let locale = Self::parse(tag).ok()?;
            if supported.contains(&locale) {
                return Some(locale);
            }
            let language = Self(locale.language().to_owned());
            supported.contains(&language).then_some(language)
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The language part, e.g. `en` for `en-GB`.
    #[must_use]
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT_TAG
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::default_locale()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn locales(tags: &[&str]) -> Vec<Locale> {
        tags.iter().map(|t| Locale::parse(t).unwrap()).collect()
    }

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!(Locale::parse("EN").unwrap().as_str(), "en");
        assert_eq!(Locale::parse("en_gb").unwrap().as_str(), "en-GB");
        assert_eq!(Locale::parse(" ro-ro ").unwrap().as_str(), "ro-RO");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("eng").is_err());
        assert!(Locale::parse("en-").is_err());
        assert!(Locale::parse("e1").is_err());
        assert!(Locale::parse("en-GBR").is_err());
    }

    #[test]
    fn test_language() {
        assert_eq!(Locale::parse("de-AT").unwrap().language(), "de");
        assert_eq!(Locale::default().language(), "en");
    }

    #[test]
    fn test_accept_language_picks_highest_supported() {
        let supported = locales(&["en", "ro"]);
        let picked = Locale::from_accept_language("fr-FR,ro;q=0.8,en;q=0.5", &supported);
        assert_eq!(picked.unwrap().as_str(), "ro");
    }

    #[test]
    fn test_accept_language_falls_back_to_language() {
        let supported = locales(&["en", "de"]);
        let picked = Locale::from_accept_language("de-CH", &supported);
        assert_eq!(picked.unwrap().as_str(), "de");
    }

    #[test]
    fn test_accept_language_none_supported() {
        let supported = locales(&["en"]);
        assert!(Locale::from_accept_language("ja,zh;q=0.9", &supported).is_none());
        assert!(Locale::from_accept_language("", &supported).is_none());
        assert!(Locale::from_accept_language("*", &supported).is_none());
    }

    #[test]
    fn test_serde_validates() {
        let l: Locale = serde_json::from_str("\"ro\"").unwrap();
        assert_eq!(l.as_str(), "ro");
        assert!(serde_json::from_str::<Locale>("\"romanian\"").is_err());
    }
}
