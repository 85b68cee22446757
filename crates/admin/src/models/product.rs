//! Catalog rows and the product/family edit forms.
//!
//! The nested JSON columns are edited as plain inputs (dimensions, load
//! ratings) or as `left: right` lines (features, suffixes, cross references).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;

use bearing_shop_core::catalog::{
    Dimensions, LoadRatings, ParallelProduct, SuffixDescription, TechnicalFeature, format_pairs,
    parse_pairs, slugify,
};
use bearing_shop_core::{Currency, Money, ProductFamilyId, ProductId};

/// A bearing as stored in `products`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub family_id: Option<ProductFamilyId>,
    pub part_number: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub origin: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub images: Vec<String>,
    pub dimensions: Json<Dimensions>,
    pub load_ratings: Json<LoadRatings>,
    pub technical_features: Json<Vec<TechnicalFeature>>,
    pub suffix_descriptions: Json<Vec<SuffixDescription>>,
    pub parallel_products: Json<Vec<ParallelProduct>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the product list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductListRow {
    pub id: ProductId,
    pub part_number: String,
    pub name: String,
    pub brand: Option<String>,
    pub family_name: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
    pub image: Option<String>,
}

impl ProductListRow {
    /// Catalog price in the base currency.
    #[must_use]
    pub fn price_display(&self) -> String {
        Money::new(self.price, Currency::BASE).display()
    }
}

/// A product family as stored in `product_families`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductFamily {
    pub id: ProductFamilyId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub product_count: i64,
}

/// Why a submitted form was refused. Shown above the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FormError {
    pub field: &'static str,
    pub message: String,
}

impl FormError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Product edit form as posted by the browser. Every field arrives as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub part_number: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub origin: String,
    pub price: String,
    pub stock: String,
    pub family_id: String,
    /// Checkbox: present ("on") when ticked.
    pub active: Option<String>,
    pub bore_mm: String,
    pub outer_diameter_mm: String,
    pub width_mm: String,
    pub weight_kg: String,
    pub dynamic_kn: String,
    pub static_kn: String,
    pub fatigue_limit_kn: String,
    pub reference_speed_rpm: String,
    pub limiting_speed_rpm: String,
    /// `name: value` per line.
    pub technical_features: String,
    /// `suffix: description` per line.
    pub suffix_descriptions: String,
    /// `brand: part number` per line.
    pub parallel_products: String,
}

/// Validated product values ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub family_id: Option<ProductFamilyId>,
    pub part_number: String,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub origin: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub active: bool,
    pub dimensions: Dimensions,
    pub load_ratings: LoadRatings,
    pub technical_features: Vec<TechnicalFeature>,
    pub suffix_descriptions: Vec<SuffixDescription>,
    pub parallel_products: Vec<ParallelProduct>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn optional_number(field: &'static str, value: &str) -> Result<Option<f64>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let number: f64 = value
        .replace(',', ".")
        .parse()
        .map_err(|_| FormError::new(field, "must be a number"))?;
    if !number.is_finite() || number < 0.0 {
        return Err(FormError::new(field, "must be zero or more"));
    }
    Ok(Some(number))
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl ProductForm {
    /// Check presence and number formats.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<ProductInput, FormError> {
        let part_number = non_empty(&self.part_number)
            .ok_or_else(|| FormError::new("part_number", "is required"))?;
        let name = non_empty(&self.name).ok_or_else(|| FormError::new("name", "is required"))?;

        let price: Decimal = self
            .price
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| FormError::new("price", "must be a decimal amount"))?;
        if price.is_sign_negative() {
            return Err(FormError::new("price", "must be zero or more"));
        }

        let stock = match self.stock.trim() {
            "" => 0,
            raw => raw
                .parse::<i32>()
                .map_err(|_| FormError::new("stock", "must be a whole number"))?,
        };

        let family_id = match self.family_id.trim() {
            "" => None,
            raw => Some(ProductFamilyId::new(
                raw.parse()
                    .map_err(|_| FormError::new("family_id", "unknown family"))?,
            )),
        };

        let dimensions = Dimensions {
            bore_mm: optional_number("bore_mm", &self.bore_mm)?,
            outer_diameter_mm: optional_number("outer_diameter_mm", &self.outer_diameter_mm)?,
            width_mm: optional_number("width_mm", &self.width_mm)?,
            weight_kg: optional_number("weight_kg", &self.weight_kg)?,
        };
        let load_ratings = LoadRatings {
            dynamic_kn: optional_number("dynamic_kn", &self.dynamic_kn)?,
            static_kn: optional_number("static_kn", &self.static_kn)?,
            fatigue_limit_kn: optional_number("fatigue_limit_kn", &self.fatigue_limit_kn)?,
            reference_speed_rpm: optional_number("reference_speed_rpm", &self.reference_speed_rpm)?,
            limiting_speed_rpm: optional_number("limiting_speed_rpm", &self.limiting_speed_rpm)?,
        };

        Ok(ProductInput {
            family_id,
            part_number,
            name,
            description: non_empty(&self.description),
            brand: non_empty(&self.brand),
            origin: non_empty(&self.origin),
            price: price.round_dp(2),
            stock,
            active: self.active.is_some(),
            dimensions,
            load_ratings,
            technical_features: parse_pairs(&self.technical_features, ':')
                .into_iter()
                .map(|(name, value)| TechnicalFeature { name, value })
                .collect(),
            suffix_descriptions: parse_pairs(&self.suffix_descriptions, ':')
                .into_iter()
                .map(|(suffix, description)| SuffixDescription {
                    suffix,
                    description,
                })
                .collect(),
            parallel_products: parse_pairs(&self.parallel_products, ':')
                .into_iter()
                .map(|(brand, part_number)| ParallelProduct { brand, part_number })
                .collect(),
        })
    }

    /// Blank form for a new product: active, nothing else filled in.
    #[must_use]
    pub fn new_product() -> Self {
        Self {
            active: Some("on".to_owned()),
            ..Self::default()
        }
    }

    /// Prefill the form from a stored product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let dims = &product.dimensions.0;
        let ratings = &product.load_ratings.0;
        Self {
            part_number: product.part_number.clone(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            brand: product.brand.clone().unwrap_or_default(),
            origin: product.origin.clone().unwrap_or_default(),
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            family_id: product
                .family_id
                .map(|id| id.as_i32().to_string())
                .unwrap_or_default(),
            active: product.active.then(|| "on".to_owned()),
            bore_mm: format_number(dims.bore_mm),
            outer_diameter_mm: format_number(dims.outer_diameter_mm),
            width_mm: format_number(dims.width_mm),
            weight_kg: format_number(dims.weight_kg),
            dynamic_kn: format_number(ratings.dynamic_kn),
            static_kn: format_number(ratings.static_kn),
            fatigue_limit_kn: format_number(ratings.fatigue_limit_kn),
            reference_speed_rpm: format_number(ratings.reference_speed_rpm),
            limiting_speed_rpm: format_number(ratings.limiting_speed_rpm),
            technical_features: format_pairs(
                product
                    .technical_features
                    .iter()
                    .map(|f| (f.name.as_str(), f.value.as_str())),
                ':',
            ),
            suffix_descriptions: format_pairs(
                product
                    .suffix_descriptions
                    .iter()
                    .map(|s| (s.suffix.as_str(), s.description.as_str())),
                ':',
            ),
            parallel_products: format_pairs(
                product
                    .parallel_products
                    .iter()
                    .map(|p| (p.brand.as_str(), p.part_number.as_str())),
                ':',
            ),
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Whether `family` is the selected family, for the `<select>`.
    #[must_use]
    pub fn family_selected(&self, family: ProductFamilyId) -> bool {
        self.family_id.trim() == family.as_i32().to_string()
    }
}

/// Family edit form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FamilyForm {
    pub name: String,
    /// Derived from the name when left blank.
    pub slug: String,
    pub description: String,
    pub brand: String,
}

/// Validated family values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
}

impl FamilyForm {
    /// # Errors
    ///
    /// Returns an error when the name is blank or no slug can be derived.
    pub fn validate(&self) -> Result<FamilyInput, FormError> {
        let name = non_empty(&self.name).ok_or_else(|| FormError::new("name", "is required"))?;
        let slug = match non_empty(&self.slug) {
            Some(slug) => slugify(&slug),
            None => slugify(&name),
        };
        if slug.is_empty() {
            return Err(FormError::new("slug", "needs at least one letter or digit"));
        }
        Ok(FamilyInput {
            name,
            slug,
            description: non_empty(&self.description),
            brand: non_empty(&self.brand),
        })
    }

    #[must_use]
    pub fn from_family(family: &ProductFamily) -> Self {
        Self {
            name: family.name.clone(),
            slug: family.slug.clone(),
            description: family.description.clone().unwrap_or_default(),
            brand: family.brand.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            part_number: " 6205-2RS ".to_owned(),
            name: "Deep groove ball bearing".to_owned(),
            price: "12,5".to_owned(),
            stock: "40".to_owned(),
            family_id: "3".to_owned(),
            active: Some("on".to_owned()),
            bore_mm: "25".to_owned(),
            outer_diameter_mm: "52".to_owned(),
            width_mm: "15".to_owned(),
            dynamic_kn: "14.8".to_owned(),
            technical_features: "Seal: 2RS\nCage: steel\n".to_owned(),
            parallel_products: "FAG: 6205-2RSR".to_owned(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_validate_parses_numbers_and_pairs() {
        let input = form().validate().unwrap();
        assert_eq!(input.part_number, "6205-2RS");
        assert_eq!(input.price, Decimal::new(1250, 2));
        assert_eq!(input.stock, 40);
        assert_eq!(input.family_id, Some(ProductFamilyId::new(3)));
        assert!(input.active);
        assert_eq!(input.dimensions.summary().unwrap(), "25 × 52 × 15 mm");
        assert_eq!(input.load_ratings.dynamic_kn, Some(14.8));
        assert_eq!(input.technical_features.len(), 2);
        assert_eq!(input.parallel_products[0].part_number, "6205-2RSR");
        assert!(input.description.is_none());
    }

    #[test]
    fn test_validate_reports_field() {
        let mut bad = form();
        bad.price = "twelve".to_owned();
        assert_eq!(bad.validate().unwrap_err().field, "price");

        let mut bad = form();
        bad.width_mm = "-1".to_owned();
        assert_eq!(bad.validate().unwrap_err().field, "width_mm");

        let mut bad = form();
        bad.name = "   ".to_owned();
        assert_eq!(bad.validate().unwrap_err().to_string(), "name: is required");
    }

    #[test]
    fn test_unchecked_box_means_inactive() {
        let mut f = form();
        f.active = None;
        assert!(!f.validate().unwrap().active);
    }

    #[test]
    fn test_family_slug_derived_from_name() {
        let family = FamilyForm {
            name: "Tapered Roller Bearings".to_owned(),
            ..FamilyForm::default()
        };
        assert_eq!(family.validate().unwrap().slug, "tapered-roller-bearings");

        let blank = FamilyForm {
            name: "!!!".to_owned(),
            ..FamilyForm::default()
        };
        assert_eq!(blank.validate().unwrap_err().field, "slug");
    }
}
