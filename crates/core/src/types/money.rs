//! Money and the static currency table.
//!
//! Catalog prices are stored in the base currency (EUR). Everything shown to
//! a visitor or charged through the payment API is converted with the fixed
//! rates below and rounded to cents.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Supported display and charge currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro, the catalog base currency.
    #[default]
    Eur,
    Usd,
    Gbp,
    Ron,
}

/// Error returned when a currency code is not in the table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported currency: {0}")]
pub struct UnknownCurrency(pub String);

impl Currency {
    /// Every supported currency, base first.
    pub const ALL: [Self; 4] = [Self::Eur, Self::Usd, Self::Gbp, Self::Ron];

    /// The base currency catalog prices are stored in.
    pub const BASE: Self = Self::Eur;

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Ron => "RON",
        }
    }

    /// Lowercase code as the payment API expects it.
    #[must_use]
    pub const fn api_code(self) -> &'static str {
        match self {
            Self::Eur => "eur",
            Self::Usd => "usd",
            Self::Gbp => "gbp",
            Self::Ron => "ron",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eur => "€",
            Self::Usd => "$",
            Self::Gbp => "£",
            Self::Ron => "lei",
        }
    }

    /// Units of this currency per one unit of the base currency.
    #[must_use]
    pub fn rate_from_base(self) -> Decimal {
        match self {
            Self::Eur => Decimal::ONE,
            Self::Usd => Decimal::new(108, 2),
            Self::Gbp => Decimal::new(85, 2),
            Self::Ron => Decimal::new(497, 2),
        }
    }

    const fn symbol_is_suffix(self) -> bool {
        matches!(self, Self::Ron)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCurrency(s.to_owned()))
    }
}

/// Round to cents, half away from zero.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// An amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// An amount in the base currency.
    #[must_use]
    pub const fn base(amount: Decimal) -> Self {
        Self::new(amount, Currency::BASE)
    }

    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Convert through the base currency, rounding the result to cents.
    #[must_use]
    pub fn convert_to(self, target: Currency) -> Self {
        if self.currency == target {
            return Self::new(round_cents(self.amount), target);
        }
        let in_base = self.amount / self.currency.rate_from_base();
        Self::new(round_cents(in_base * target.rate_from_base()), target)
    }

    /// Amount in the smallest currency unit (cents), as the payment API
    /// expects. `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn minor_units(self) -> Option<i64> {
        (round_cents(self.amount) * Decimal::ONE_HUNDRED).to_i64()
    }

    /// Format for display, e.g. `€1,234.50`, `-$3.00` or `99.90 lei`.
    #[must_use]
    pub fn display(self) -> String {
        let rounded = round_cents(self.amount);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = format!("{:.2}", rounded.abs());
        let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        let grouped = group_thousands(whole);

        if self.currency.symbol_is_suffix() {
            format!("{sign}{grouped}.{frac} {}", self.currency.symbol())
        } else {
            format!("{sign}{}{grouped}.{frac}", self.currency.symbol())
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(whole: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_currency_from_str_is_case_insensitive() {
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::from_str(" Ron ").unwrap(), Currency::Ron);
        assert!(Currency::from_str("JPY").is_err());
    }

    #[test]
    fn test_currency_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
        let c: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(c, Currency::Eur);
    }

    #[test]
    fn test_convert_from_base() {
        let m = Money::base(dec("100.00")).convert_to(Currency::Usd);
        assert_eq!(m.amount, dec("108.00"));
        assert_eq!(m.currency, Currency::Usd);

        let m = Money::base(dec("10.55")).convert_to(Currency::Ron);
        // 10.55 * 4.97 = 52.4335
        assert_eq!(m.amount, dec("52.43"));
    }

    #[test]
    fn test_convert_between_non_base() {
        // 108 USD -> 100 EUR -> 85 GBP
        let m = Money::new(dec("108"), Currency::Usd).convert_to(Currency::Gbp);
        assert_eq!(m.amount, dec("85.00"));
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(round_cents(dec("0.125")), dec("0.13"));
        assert_eq!(round_cents(dec("-0.125")), dec("-0.13"));
        assert_eq!(round_cents(dec("0.124")), dec("0.12"));
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(Money::base(dec("12.34")).minor_units(), Some(1234));
        assert_eq!(Money::base(dec("0.005")).minor_units(), Some(1));
        assert_eq!(Money::zero(Currency::Usd).minor_units(), Some(0));
    }

    #[test]
    fn test_display_prefix_symbols() {
        assert_eq!(Money::base(dec("1234.5")).display(), "€1,234.50");
        assert_eq!(Money::new(dec("3"), Currency::Usd).display(), "$3.00");
        assert_eq!(
            Money::new(dec("1234567.891"), Currency::Gbp).display(),
            "£1,234,567.89"
        );
        assert_eq!(Money::new(dec("-3"), Currency::Usd).display(), "-$3.00");
    }

    #[test]
    fn test_display_ron_suffix() {
        assert_eq!(Money::new(dec("99.9"), Currency::Ron).display(), "99.90 lei");
        assert_eq!(Money::new(dec("1000"), Currency::Ron).to_string(), "1,000.00 lei");
    }
}
