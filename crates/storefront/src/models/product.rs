//! Catalog rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use bearing_shop_core::catalog::{
    Dimensions, LoadRatings, ParallelProduct, SuffixDescription, TechnicalFeature,
};
use bearing_shop_core::{CartItem, Currency, Money, ProductFamilyId, ProductId};

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
    /// Unit price in the base currency.
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

impl Product {
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Price converted to the visitor's currency.
    #[must_use]
    pub fn price_in(&self, currency: Currency) -> Money {
        Money::base(self.price).convert_to(currency)
    }

    /// Snapshot this product as a cart line.
    #[must_use]
    pub fn to_cart_item(&self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            part_number: self.part_number.clone(),
            name: self.name.clone(),
            price: self.price,
            quantity,
            image: self.primary_image().map(str::to_owned),
        }
    }
}

/// A product family (series) as stored in `product_families`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductFamily {
    pub id: ProductFamilyId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub images: Vec<String>,
}

/// A family with the number of active products in it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FamilySummary {
    pub id: ProductFamilyId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub product_count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    pub fn product(id: i32, part_number: &str, price: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            family_id: None,
            part_number: part_number.to_owned(),
            name: format!("Deep groove ball bearing {part_number}"),
            description: None,
            brand: Some("SKF".to_owned()),
            origin: None,
            price,
            stock: 5,
            images: vec!["https://cdn.test/6205.jpg".to_owned()],
            dimensions: Json(Dimensions::default()),
            load_ratings: Json(LoadRatings::default()),
            technical_features: Json(Vec::new()),
            suffix_descriptions: Json(Vec::new()),
            parallel_products: Json(Vec::new()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cart_item_snapshots_price_and_image() {
        let product = fixtures::product(3, "6205-2RS", Decimal::new(1250, 2));
        let item = product.to_cart_item(4);

        assert_eq!(item.id, ProductId::new(3));
        assert_eq!(item.price, Decimal::new(1250, 2));
        assert_eq!(item.image.as_deref(), Some("https://cdn.test/6205.jpg"));
        assert_eq!(item.line_total(), Decimal::new(5000, 2));
    }

    #[test]
    fn test_price_in_converts() {
        let product = fixtures::product(1, "6205", Decimal::new(1000, 2));
        assert_eq!(product.price_in(Currency::Usd).amount, Decimal::new(1080, 2));
        assert_eq!(product.price_in(Currency::Eur).amount, Decimal::new(1000, 2));
    }
}
