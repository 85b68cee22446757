//! Admin configuration, read from the environment (and `.env` when present).
//!
//! Required: `ADMIN_DATABASE_URL` (or `DATABASE_URL`), `ADMIN_BASE_URL`,
//! `ADMIN_SESSION_SECRET`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`,
//! `SUPABASE_SERVICE_ROLE_KEY`, `STOREFRONT_BASE_URL`.
//!
//! Optional, with defaults:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ADMIN_HOST` / `ADMIN_PORT` | `127.0.0.1` / `3001` |
//! | `STORAGE_BUCKET` | `product-images` |
//! | `MAX_UPLOAD_BYTES` | 5 MiB |
//! | `SUPPORTED_LOCALES` | `en,ro` (base language first, the rest get translation forms) |
//! | `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` | email off unless `SMTP_HOST` is set; port 587 |
//! | `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE` | off; 1.0; 0.1 |

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use bearing_shop_core::Locale;
use secrecy::SecretString;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_BUCKET: &str = "product-images";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Lowercase fragments that mark a copied-in placeholder rather than a real key.
const PLACEHOLDERS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public URL of the panel, no trailing slash.
    pub base_url: String,
    pub session_secret: SecretString,
    pub supabase: SupabaseAdminConfig,
    /// Used for links in customer emails and notifications.
    pub storefront_base_url: String,
    pub max_upload_bytes: usize,
    /// Content locales, base language first.
    pub locales: Vec<Locale>,
    /// `None` disables status-update emails.
    pub email: Option<EmailConfig>,
    pub sentry: SentryConfig,
}

/// Staff sign-in (anon key) and image storage (service-role key).
#[derive(Clone)]
pub struct SupabaseAdminConfig {
    pub url: String,
    pub anon_key: SecretString,
    /// Bypasses row level security.
    pub service_role_key: SecretString,
    pub bucket: String,
}

impl fmt::Debug for SupabaseAdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseAdminConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("service_role_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// `From` header.
    pub from_address: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Error tracking; reporting is off without a DSN.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

impl AdminConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or unparsable variable, or a
    /// secret that is too short, a placeholder, or low in entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: database_url("ADMIN_DATABASE_URL")?,
            host: parsed_or("ADMIN_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
            port: parsed_or("ADMIN_PORT", 3001)?,
            base_url: base_url("ADMIN_BASE_URL")?,
            session_secret: session_secret("ADMIN_SESSION_SECRET")?,
            supabase: SupabaseAdminConfig {
                url: required("SUPABASE_URL")?,
                anon_key: required("SUPABASE_ANON_KEY")?.into(),
                service_role_key: strong_secret("SUPABASE_SERVICE_ROLE_KEY")?,
                bucket: optional("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_owned()),
            },
            storefront_base_url: base_url("STOREFRONT_BASE_URL")?,
            max_upload_bytes: parsed_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            locales: parse_locales(&optional("SUPPORTED_LOCALES").unwrap_or_default())?,
            email: EmailConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Locales edited as translations of the base content.
    #[must_use]
    pub fn translation_locales(&self) -> &[Locale] {
        self.locales.get(1..).unwrap_or(&[])
    }

    /// Absolute storefront URL for a path, for customer-facing links.
    #[must_use]
    pub fn storefront_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.storefront_base_url,
            path.trim_start_matches('/')
        )
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = optional("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            smtp_host,
            smtp_port: parsed_or("SMTP_PORT", 587)?,
            smtp_username: required("SMTP_USERNAME")?,
            smtp_password: required("SMTP_PASSWORD")?.into(),
            from_address: required("EMAIL_FROM")?,
        }))
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            dsn: optional("SENTRY_DSN"),
            environment: optional("SENTRY_ENVIRONMENT"),
            sample_rate: parsed_or("SENTRY_SAMPLE_RATE", defaults.sample_rate)?,
            traces_sample_rate: parsed_or("SENTRY_TRACES_SAMPLE_RATE", defaults.traces_sample_rate)?,
        })
    }
}

/// Comma-separated tags, deduplicated, with the base locale moved first.
/// Blank means the default `en,ro`.
fn parse_locales(raw: &str) -> Result<Vec<Locale>, ConfigError> {
    let raw = if raw.trim().is_empty() { "en,ro" } else { raw };
    let mut locales = vec![Locale::default_locale()];
    for tag in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let locale = Locale::parse(tag).map_err(|e| invalid("SUPPORTED_LOCALES", e))?;
        if !locales.contains(&locale) {
            locales.push(locale);
        }
    }
    Ok(locales)
}

// =============================================================================
// Environment access
// =============================================================================

fn invalid(key: &str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_owned(), reason.to_string())
}

/// Set and not blank.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Parse `key`, or fall back to `default` when it is unset.
fn parsed_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    optional(key).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e| invalid(key, e))
    })
}

fn base_url(key: &str) -> Result<String, ConfigError> {
    Ok(required(key)?.trim_end_matches('/').to_owned())
}

/// `key`, or the generic `DATABASE_URL` that `fly postgres attach` sets.
fn database_url(key: &str) -> Result<SecretString, ConfigError> {
    optional(key)
        .or_else(|| optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
}

fn session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required(key)?;
    if value.chars().count() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters"),
        ));
    }
    check_secret_strength(key, &value)?;
    Ok(value.into())
}

fn strong_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required(key)?;
    check_secret_strength(key, &value)?;
    Ok(value.into())
}

/// Shannon entropy in bits per character.
fn entropy_bits(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = f64::from(counts.values().sum::<u32>());
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

fn check_secret_strength(key: &str, value: &str) -> Result<(), ConfigError> {
    let lower = value.to_lowercase();
    if let Some(fragment) = PLACEHOLDERS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            format!("looks like a placeholder (contains '{fragment}')"),
        ));
    }
    let bits = entropy_bits(value);
    if bits < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            key.to_owned(),
            format!(
                "entropy too low ({bits:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR}); generate it randomly"
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> AdminConfig {
        AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            base_url: "http://localhost:3001".to_owned(),
            session_secret: SecretString::from("x".repeat(32)),
            supabase: SupabaseAdminConfig {
                url: "https://proj.supabase.co".to_owned(),
                anon_key: SecretString::from("anon_key_value"),
                service_role_key: SecretString::from("service_role_value"),
                bucket: DEFAULT_BUCKET.to_owned(),
            },
            storefront_base_url: "https://shop.test".to_owned(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            locales: parse_locales("en,ro").unwrap(),
            email: None,
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_base_locale_always_first() {
        let tags = |raw| {
            parse_locales(raw)
                .unwrap()
                .iter()
                .map(|l| l.as_str().to_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(tags("ro, en,ro"), ["en", "ro"]);
        assert_eq!(tags("ro"), ["en", "ro"]);
        assert_eq!(tags(""), ["en", "ro"]);
        assert!(parse_locales("en,!!").is_err());

        let config = test_config();
        let translations: Vec<&str> = config
            .translation_locales()
            .iter()
            .map(Locale::as_str)
            .collect();
        assert_eq!(translations, ["ro"]);
    }

    #[test]
    fn test_secret_strength() {
        assert!(check_secret_strength("K", "your-service-role-key").is_err());
        assert!(check_secret_strength("K", &"a".repeat(40)).is_err());
        assert!(
            check_secret_strength("K", "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.c2VydmljZQ").is_ok()
        );
    }

    #[test]
    fn test_entropy_bits() {
        assert!(entropy_bits("").abs() < f64::EPSILON);
        assert!((entropy_bits("ab") - 1.0).abs() < 1e-9);
        assert!((entropy_bits("abcd") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_storefront_url() {
        let config = test_config();
        assert_eq!(
            config.storefront_url("/account/orders/7"),
            "https://shop.test/account/orders/7"
        );
        assert_eq!(config.socket_addr().port(), 3001);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_config());
        assert!(debug_output.contains("product-images"));
        assert!(!debug_output.contains("service_role_value"));
        assert!(!debug_output.contains("anon_key_value"));
    }
}
