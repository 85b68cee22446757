//! Catalog shapes shared by the storefront, the admin panel and the seeder.
//!
//! The nested technical fields live in JSONB columns. Every field is
//! optional on read so partially filled rows still render.

use serde::{Deserialize, Serialize};

/// Physical dimensions of a bearing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dimensions {
    /// Bore diameter `d` in millimetres.
    pub bore_mm: Option<f64>,
    /// Outside diameter `D` in millimetres.
    pub outer_diameter_mm: Option<f64>,
    /// Width `B` in millimetres.
    pub width_mm: Option<f64>,
    pub weight_kg: Option<f64>,
}

impl Dimensions {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bore_mm.is_none()
            && self.outer_diameter_mm.is_none()
            && self.width_mm.is_none()
            && self.weight_kg.is_none()
    }

    /// `d × D × B` shorthand, e.g. `25 × 52 × 15 mm`.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let (d, outer, b) = (self.bore_mm?, self.outer_diameter_mm?, self.width_mm?);
        Some(format!("{d} × {outer} × {b} mm"))
    }
}

/// Load ratings and speed limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadRatings {
    /// Basic dynamic load rating `C` in kN.
    pub dynamic_kn: Option<f64>,
    /// Basic static load rating `C0` in kN.
    pub static_kn: Option<f64>,
    /// Fatigue load limit `Pu` in kN.
    pub fatigue_limit_kn: Option<f64>,
    pub reference_speed_rpm: Option<f64>,
    pub limiting_speed_rpm: Option<f64>,
}

impl LoadRatings {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.dynamic_kn.is_none()
            && self.static_kn.is_none()
            && self.fatigue_limit_kn.is_none()
            && self.reference_speed_rpm.is_none()
            && self.limiting_speed_rpm.is_none()
    }
}

/// A free-form technical attribute, e.g. `Seal type: 2RS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalFeature {
    pub name: String,
    pub value: String,
}

/// Meaning of a designation suffix, e.g. `C3: radial clearance greater than normal`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffixDescription {
    pub suffix: String,
    pub description: String,
}

/// An equivalent part from another manufacturer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelProduct {
    pub brand: String,
    pub part_number: String,
}

/// Parse `name: value` lines into pairs, skipping blank or malformed lines.
///
/// Used by the admin editors and the seeder for the list-shaped fields.
#[must_use]
pub fn parse_pairs(text: &str, separator: char) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| {
            let (left, right) = line.split_once(separator)?;
            let (left, right) = (left.trim(), right.trim());
            (!left.is_empty() && !right.is_empty()).then(|| (left.to_owned(), right.to_owned()))
        })
        .collect()
}

/// Inverse of [`parse_pairs`].
#[must_use]
pub fn format_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>, separator: char) -> String {
    pairs
        .into_iter()
        .map(|(left, right)| format!("{left}{separator} {right}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase, ASCII-only, hyphen-separated slug.
///
/// ```
/// use bearing_shop_core::catalog::slugify;
/// assert_eq!(slugify("Deep Groove Ball Bearings (62xx)"), "deep-groove-ball-bearings-62xx");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_tolerate_missing_fields() {
        let dims: Dimensions = serde_json::from_str(r#"{"bore_mm": 25}"#).unwrap();
        assert_eq!(dims.bore_mm, Some(25.0));
        assert!(dims.summary().is_none());
        assert!(!dims.is_empty());

        let empty: Dimensions = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_dimensions_summary() {
        let dims = Dimensions {
            bore_mm: Some(25.0),
            outer_diameter_mm: Some(52.0),
            width_mm: Some(15.0),
            weight_kg: None,
        };
        assert_eq!(dims.summary().unwrap(), "25 × 52 × 15 mm");
    }

    #[test]
    fn test_parse_pairs_skips_junk() {
        let pairs = parse_pairs("C3: larger clearance\n\nno separator\n  2RS : rubber seals ", ':');
        assert_eq!(
            pairs,
            vec![
                ("C3".to_owned(), "larger clearance".to_owned()),
                ("2RS".to_owned(), "rubber seals".to_owned()),
            ]
        );
    }

    #[test]
    fn test_format_pairs() {
        let text = format_pairs([("SKF", "6205-2RS"), ("FAG", "6205-2RSR")], ':');
        assert_eq!(text, "SKF: 6205-2RS\nFAG: 6205-2RSR");
        assert_eq!(parse_pairs(&text, ':').len(), 2);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Tapered  Roller -- Bearings "), "tapered-roller-bearings");
        assert_eq!(slugify("Ünïcode"), "n-code");
        assert_eq!(slugify("---"), "");
    }
}
