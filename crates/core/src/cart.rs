//! Shopping cart.
//!
//! The cart lives in the visitor's session and, for signed-in customers, is
//! mirrored to `user_settings.cart`. Prices are snapshots in the base
//! currency; checkout re-prices against the catalog with [`Cart::reprice`].

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, Money, ProductId};

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub part_number: String,
    pub name: String,
    /// Unit price in the base currency.
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Unit price converted to `currency` and rounded to cents.
    #[must_use]
    pub fn unit_price_in(&self, currency: Currency) -> Decimal {
        Money::base(self.price).convert_to(currency).amount
    }

    /// Rounded unit price × quantity, so order lines sum to the subtotal.
    #[must_use]
    pub fn line_total_in(&self, currency: Currency) -> Decimal {
        self.unit_price_in(currency) * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Upper bound on the quantity of a single line.
    pub const MAX_QUANTITY: u32 = 999;

    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, merging with an existing line for the same product.
    ///
    /// Quantities saturate at [`Self::MAX_QUANTITY`]; adding zero is a no-op.
    pub fn add(&mut self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(Self::MAX_QUANTITY);
            existing.price = item.price;
            existing.name = item.name;
            existing.image = item.image;
        } else {
            let quantity = item.quantity.min(Self::MAX_QUANTITY);
            self.items.push(CartItem { quantity, ..item });
        }
    }

    /// Set a line's quantity; zero removes it. Returns `false` if the
    /// product is not in the cart.
    pub fn set_quantity(&mut self, id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(id);
        }
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.quantity = quantity.min(Self::MAX_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `false` if it was not present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity))
    }

    /// Σ price × quantity in the base currency.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ [`CartItem::line_total_in`] for `currency`.
    #[must_use]
    pub fn subtotal_in(&self, currency: Currency) -> Decimal {
        self.items.iter().map(|i| i.line_total_in(currency)).sum()
    }

    /// Merge a stored (mirrored) cart into this session cart at sign-in.
    ///
    /// Lines only present in `stored` are appended; for products in both,
    /// the session line wins unchanged.
    pub fn merge_stored(&mut self, stored: Self) {
        for item in stored.items {
            if item.quantity > 0 && !self.items.iter().any(|i| i.id == item.id) {
                let quantity = item.quantity.min(Self::MAX_QUANTITY);
                self.items.push(CartItem { quantity, ..item });
            }
        }
    }

    /// Replace snapshot prices with current catalog prices.
    ///
    /// Lines whose product is missing from `prices` (deleted or inactive)
    /// are dropped. Returns the ids that were dropped.
    pub fn reprice<S: std::hash::BuildHasher>(
        &mut self,
        prices: &HashMap<ProductId, Decimal, S>,
    ) -> Vec<ProductId> {
        let mut dropped = Vec::new();
        self.items.retain_mut(|item| match prices.get(&item.id) {
            Some(price) => {
                item.price = *price;
                true
            }
            None => {
                dropped.push(item.id);
                false
            }
        });
        dropped
    }

    /// Ids of every product in the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|i| i.id).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(id: i32, price: &str, quantity: u32) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            part_number: format!("62{id:02}"),
            name: format!("Bearing {id}"),
            price: Decimal::from_str(price).unwrap(),
            quantity,
            image: None,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(item(1, "10.00", 2));
        cart.add(item(1, "10.00", 3));
        cart.add(item(2, "4.50", 1));

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_add_saturates_at_max() {
        let mut cart = Cart::new();
        cart.add(item(1, "1", 998));
        cart.add(item(1, "1", 5));
        assert_eq!(cart.items[0].quantity, Cart::MAX_QUANTITY);

        cart.add(item(2, "1", 5000));
        assert_eq!(cart.items[1].quantity, Cart::MAX_QUANTITY);
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add(item(1, "1", 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add(item(1, "1", 2));
        assert!(cart.set_quantity(ProductId::new(1), 7));
        assert_eq!(cart.items[0].quantity, 7);
        assert!(cart.set_quantity(ProductId::new(1), 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(ProductId::new(9), 1));
    }

    #[test]
    fn test_subtotal_is_sum_of_price_times_quantity() {
        let mut cart = Cart::new();
        cart.add(item(1, "12.50", 2));
        cart.add(item(2, "3.99", 3));
        assert_eq!(cart.subtotal(), Decimal::from_str("36.97").unwrap());
    }

    #[test]
    fn test_merge_stored_session_wins() {
        let mut session = Cart::new();
        session.add(item(1, "10", 1));

        let mut stored = Cart::new();
        stored.add(item(1, "10", 5));
        stored.add(item(2, "20", 2));

        session.merge_stored(stored);
        assert_eq!(session.items.len(), 2);
        assert_eq!(session.items[0].quantity, 1);
        assert_eq!(session.items[1].id, ProductId::new(2));
        assert_eq!(session.items[1].quantity, 2);
    }

    #[test]
    fn test_reprice_updates_and_drops() {
        let mut cart = Cart::new();
        cart.add(item(1, "10", 1));
        cart.add(item(2, "20", 1));

        let mut prices = HashMap::new();
        prices.insert(ProductId::new(1), Decimal::from_str("11.25").unwrap());

        let dropped = cart.reprice(&prices);
        assert_eq!(dropped, vec![ProductId::new(2)]);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].price, Decimal::from_str("11.25").unwrap());
    }

    #[test]
    fn test_serde_shape() {
        let mut cart = Cart::new();
        cart.add(item(3, "5.10", 2));
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json["items"][0]["id"], 3);
        assert_eq!(json["items"][0]["price"], "5.10");
        assert_eq!(json["items"][0]["quantity"], 2);

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
