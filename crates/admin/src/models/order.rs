//! Order rows as the admin panel sees them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use bearing_shop_core::order::{ShippingAddress, order_number};
use bearing_shop_core::{
    Currency, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, UserId,
};

/// An order as stored in `orders`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub shipping_address: Json<ShippingAddress>,
    pub payment_intent_id: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn number(&self) -> String {
        order_number(self.id)
    }

    /// Charge currency. Unknown codes fall back to the base currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency.parse().unwrap_or(Currency::BASE)
    }

    /// Format an amount in the order currency.
    #[must_use]
    pub fn money(&self, amount: Decimal) -> String {
        Money::new(amount, self.currency()).display()
    }

    #[must_use]
    pub fn tracking_number_or_empty(&self) -> &str {
        self.tracking_number.as_deref().unwrap_or("")
    }
}

/// A line of an order as stored in `order_items`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub part_number: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// One row of the order list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderListRow {
    pub id: OrderId,
    pub email: String,
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub currency: String,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderListRow {
    #[must_use]
    pub fn number(&self) -> String {
        order_number(self.id)
    }

    #[must_use]
    pub fn total_display(&self) -> String {
        let currency = self.currency.parse().unwrap_or(Currency::BASE);
        Money::new(self.total, currency).display()
    }
}
