//! Order-level shapes that are not tied to a database row.

use serde::{Deserialize, Serialize};

use crate::OrderId;

/// Shipping address captured at checkout and stored as a JSONB blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingAddress {
    pub full_name: String,
    pub company: String,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
}

impl ShippingAddress {
    /// Names of required fields that are blank. Empty means the address is usable.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Trim every field in place.
    #[must_use]
    pub fn trimmed(self) -> Self {
        let t = |s: String| s.trim().to_owned();
        Self {
            full_name: t(self.full_name),
            company: t(self.company),
            line1: t(self.line1),
            line2: t(self.line2),
            city: t(self.city),
            postal_code: t(self.postal_code),
            country: t(self.country),
            phone: t(self.phone),
        }
    }

    /// Non-empty address lines in display order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let city_line = [self.postal_code.as_str(), self.city.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [
            self.full_name.clone(),
            self.company.clone(),
            self.line1.clone(),
            self.line2.clone(),
            city_line,
            self.country.clone(),
        ]
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect()
    }
}

/// Customer-facing order number, e.g. `BS-000042`.
#[must_use]
pub fn order_number(id: OrderId) -> String {
    format!("BS-{:06}", id.as_i32())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let addr = ShippingAddress {
            full_name: "Ana Pop".into(),
            line1: "  ".into(),
            city: "Cluj".into(),
            ..Default::default()
        };
        assert_eq!(addr.missing_fields(), vec!["line1", "postal_code", "country"]);
    }

    #[test]
    fn test_complete_address_has_no_missing_fields() {
        let addr = ShippingAddress {
            full_name: "Ana Pop".into(),
            line1: "Str. Fabricii 1".into(),
            city: "Cluj".into(),
            postal_code: "400000".into(),
            country: "RO".into(),
            ..Default::default()
        };
        assert!(addr.missing_fields().is_empty());
        assert_eq!(
            addr.lines(),
            vec!["Ana Pop", "Str. Fabricii 1", "400000 Cluj", "RO"]
        );
    }

    #[test]
    fn test_order_number() {
        assert_eq!(order_number(OrderId::new(42)), "BS-000042");
    }
}
