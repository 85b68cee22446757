//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Html};
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{Currency, Money, OrderStatus};

use crate::db::{DashboardCounts, DashboardRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::OrderListRow;
use crate::routes::{Chrome, render};
use crate::state::AppState;

/// Orders shown in the "recent" table.
const RECENT_ORDERS: i64 = 8;

/// Headline numbers, formatted for the dashboard cards.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub products: i64,
    pub active_products: i64,
    pub out_of_stock: i64,
    pub open_orders: i64,
    pub orders_total: i64,
    pub unread_notifications: i64,
    pub paid_last_30_days: String,
    pub orders_by_status: Vec<(OrderStatus, i64)>,
}

impl From<DashboardCounts> for DashboardMetrics {
    fn from(counts: DashboardCounts) -> Self {
        Self {
            products: counts.products,
            active_products: counts.active_products,
            out_of_stock: counts.out_of_stock,
            open_orders: counts.open_orders(),
            orders_total: counts.orders_total(),
            unread_notifications: counts.unread_notifications,
            paid_last_30_days: Money::new(counts.paid_last_30_days, Currency::BASE).display(),
            orders_by_status: counts.orders_by_status,
        }
    }
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: Chrome,
    pub metrics: DashboardMetrics,
    pub recent_orders: Vec<OrderListRow>,
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip_all)]
pub async fn dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>> {
    let dashboard = DashboardRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());

    let (counts, recent) = tokio::join!(
        dashboard.counts(Currency::BASE.code()),
        orders.list(None, RECENT_ORDERS, 0)
    );
    let (recent_orders, _) = recent?;

    let template = DashboardTemplate {
        chrome: Chrome::new(&admin, &session, "/").await?,
        metrics: DashboardMetrics::from(counts?),
        recent_orders,
    };
    render(&template)
}
