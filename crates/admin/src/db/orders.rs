//! Order listings and fulfilment updates.

use sqlx::PgPool;

use bearing_shop_core::{OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderListRow};

const ORDER_COLUMNS: &str = r"
    id, user_id, email, status, payment_status, currency, subtotal, shipping, tax, total,
    shipping_address, payment_intent_id, tracking_number, notes, created_at, updated_at
";

/// Repository for `orders` and `order_items`.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of orders, newest first, optionally in a single status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<OrderListRow>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, OrderListRow>(
            r"
            SELECT o.id, o.email, o.shipping_address->>'full_name' AS customer_name,
                   o.status, o.payment_status, o.currency, o.total,
                   (SELECT COALESCE(SUM(i.quantity), 0)::bigint
                      FROM order_items i WHERE i.order_id = o.id) AS item_count,
                   o.created_at
            FROM orders o
            WHERE ($1::order_status IS NULL OR o.status = $1)
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE ($1::order_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// Lines of an order in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, part_number, name, unit_price, quantity, image
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }

    /// Set the fulfilment status and tracking number together.
    ///
    /// The caller has already checked the pair; the table's check constraint
    /// rejects a tracking number on any other status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        tracking_number: Option<&str>,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            r"
            UPDATE orders SET status = $2, tracking_number = $3
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status)
        .bind(tracking_number)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(order_id = %id, status = %status, "Updated order status");
        Ok(order)
    }
}
