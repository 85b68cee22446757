//! Customer and staff email addresses.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reasons an address is refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
    #[error("email must contain exactly one @ symbol")]
    MultipleAtSymbols,
    #[error("email cannot contain whitespace")]
    ContainsWhitespace,
}

/// A structurally valid address with its domain lowercased.
///
/// Checks only structure: one `@`, something on each side, no
/// whitespace, at most 254 characters. Deliverability is Supabase's problem.
///
/// ```
/// use bearing_shop_core::Email;
///
/// let email = Email::parse(" Procurement@Rulmenti.RO ").unwrap();
/// assert_eq!(email.as_str(), "Procurement@rulmenti.ro");
/// assert!(Email::parse("procurement").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EmailError::Empty);
        }
        if input.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if input.chars().any(char::is_whitespace) {
            return Err(EmailError::ContainsWhitespace);
        }

        let (local, domain) = input.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `@`, already lowercased.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_is_lowercased_local_part_kept() {
        let email = Email::parse("J.Popescu+orders@Bearings-Direct.EU").unwrap();
        assert_eq!(email.as_str(), "J.Popescu+orders@bearings-direct.eu");
        assert_eq!(email.domain(), "bearings-direct.eu");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let email: Email = "  sales@rulmenti.ro\n".parse().unwrap();
        assert_eq!(email.to_string(), "sales@rulmenti.ro");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(
            Email::parse("sales.rulmenti.ro"),
            Err(EmailError::MissingAtSymbol)
        );
        assert_eq!(
            Email::parse("sales@ops@rulmenti.ro"),
            Err(EmailError::MultipleAtSymbols)
        );
        assert_eq!(Email::parse("@rulmenti.ro"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("sales@"), Err(EmailError::EmptyDomain));
        assert_eq!(
            Email::parse("sales team@rulmenti.ro"),
            Err(EmailError::ContainsWhitespace)
        );
    }

    #[test]
    fn test_length_limit() {
        let domain = "@plant.ro";
        let fits = format!("{}{domain}", "a".repeat(Email::MAX_LENGTH - domain.len()));
        assert!(Email::parse(&fits).is_ok());

        let long = format!("a{fits}");
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong {
                max: Email::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_serde_validates_on_the_way_in() {
        let email: Email = serde_json::from_str("\"buyer@Plant.RO\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"buyer@plant.ro\"");
        assert!(serde_json::from_str::<Email>("\"not-an-address\"").is_err());
    }
}
