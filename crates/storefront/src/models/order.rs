//! Order rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use bearing_shop_core::order::{ShippingAddress, order_number};
use bearing_shop_core::{
    CheckoutTotals, Currency, Email, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus,
    ProductId, UserId,
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
    /// Human-facing order reference, e.g. `BS-000042`.
    #[must_use]
    pub fn number(&self) -> String {
        order_number(self.id)
    }

    /// Charge currency. Unknown codes fall back to the base currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency.parse().unwrap_or(Currency::BASE)
    }

    #[must_use]
    pub fn money(&self, amount: Decimal) -> Money {
        Money::new(amount, self.currency())
    }

    #[must_use]
    pub fn total_money(&self) -> Money {
        self.money(self.total)
    }

    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
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
    /// Unit price in the order currency.
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

/// Everything needed to insert an order and its lines.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub email: Email,
    pub totals: CheckoutTotals,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub part_number: String,
    pub name: String,
    /// Unit price converted to the order currency.
    pub unit_price: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}
