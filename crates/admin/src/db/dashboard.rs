//! Counts for the dashboard.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bearing_shop_core::OrderStatus;

use super::RepositoryError;

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, Default)]
pub struct DashboardCounts {
    pub products: i64,
    pub active_products: i64,
    pub out_of_stock: i64,
    /// Order count per status, in [`OrderStatus::ALL`] order, zeros included.
    pub orders_by_status: Vec<(OrderStatus, i64)>,
    /// Notifications customers have not read yet.
    pub unread_notifications: i64,
    /// Sum of paid order totals in the base currency over the last 30 days.
    /// Orders charged in other currencies are excluded.
    pub paid_last_30_days: Decimal,
}

impl DashboardCounts {
    #[must_use]
    pub fn orders_total(&self) -> i64 {
        self.orders_by_status.iter().map(|(_, n)| n).sum()
    }

    /// Orders waiting on staff: pending or processing.
    #[must_use]
    pub fn open_orders(&self) -> i64 {
        self.orders_by_status
            .iter()
            .filter(|(status, _)| matches!(status, OrderStatus::Pending | OrderStatus::Processing))
            .map(|(_, n)| n)
            .sum()
    }
}

/// Fill in zero counts and put statuses in lifecycle order.
fn order_status_counts(rows: &[(OrderStatus, i64)]) -> Vec<(OrderStatus, i64)> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| {
            let count = rows
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n);
            (status, count)
        })
        .collect()
}

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn counts(&self, base_currency: &str) -> Result<DashboardCounts, RepositoryError> {
        let (products, active_products, out_of_stock): (i64, i64, i64) = sqlx::query_as(
            r"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE active),
                   COUNT(*) FILTER (WHERE active AND stock <= 0)
            FROM products
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let status_rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(self.pool)
                .await?;

        let unread_notifications: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE NOT read")
                .fetch_one(self.pool)
                .await?;

        let paid_last_30_days: Decimal = sqlx::query_scalar(
            r"
            SELECT COALESCE(SUM(total), 0)
            FROM orders
            WHERE payment_status = 'paid'
              AND currency = $1
              AND created_at > NOW() - INTERVAL '30 days'
            ",
        )
        .bind(base_currency)
        .fetch_one(self.pool)
        .await?;

        Ok(DashboardCounts {
            products,
            active_products,
            out_of_stock,
            orders_by_status: order_status_counts(&status_rows),
            unread_notifications,
            paid_last_30_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_fill_zeros_in_order() {
        let counts = DashboardCounts {
            orders_by_status: order_status_counts(&[
                (OrderStatus::Shipped, 4),
                (OrderStatus::Pending, 2),
            ]),
            ..DashboardCounts::default()
        };

        assert_eq!(
            counts.orders_by_status,
            vec![
                (OrderStatus::Pending, 2),
                (OrderStatus::Processing, 0),
                (OrderStatus::Shipped, 4),
                (OrderStatus::Delivered, 0),
                (OrderStatus::Cancelled, 0),
            ]
        );
        assert_eq!(counts.orders_total(), 6);
        assert_eq!(counts.open_orders(), 2);
    }
}
