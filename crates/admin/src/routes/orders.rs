//! Order route handlers.
//!
//! Staff can read every order and move it through fulfilment. Payment
//! status is owned by the payment webhook and is read-only here.

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bearing_shop_core::{OrderId, OrderStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{RequireAdmin, RequireEditor};
use crate::models::{Order, OrderItem, OrderListRow};
use crate::routes::{Chrome, PAGE_SIZE, Pagination, render, render_invalid, set_flash};
use crate::services::{apply_status_change, validate_status_change};
use crate::state::AppState;

/// Query parameters for the order list.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    /// Status filter; blank or unknown means all.
    pub status: Option<String>,
    pub page: Option<i64>,
}

impl OrderListQuery {
    fn status(&self) -> Option<OrderStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Status change form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusForm {
    pub status: String,
    pub tracking_number: String,
}

/// Order list template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub chrome: Chrome,
    pub orders: Vec<OrderListRow>,
    pub statuses: [OrderStatus; 5],
    pub status: Option<OrderStatus>,
    pub pagination: Pagination,
}

impl OrdersIndexTemplate {
    fn is_status(&self, status: &OrderStatus) -> bool {
        self.status == Some(*status)
    }

    fn page_query(&self, page: i64) -> String {
        match self.status {
            Some(status) => format!("?status={status}&page={page}"),
            None => format!("?page={page}"),
        }
    }
}

/// Order detail template.
#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub chrome: Chrome,
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub statuses: [OrderStatus; 5],
    /// Values to show in the status form (the submitted ones after an error).
    pub form_status: OrderStatus,
    pub form_tracking_number: String,
    pub error: Option<String>,
}

impl OrderShowTemplate {
    fn address_lines(&self) -> Vec<String> {
        self.order.shipping_address.lines()
    }

    fn is_form_status(&self, status: &OrderStatus) -> bool {
        self.form_status == *status
    }
}

async fn load_order(state: &AppState, id: i32) -> Result<(Order, Vec<OrderItem>)> {
    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = orders.items(order.id).await?;
    Ok((order, items))
}

/// Order list, newest first.
///
/// GET /orders
#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderListQuery>,
) -> Result<Html<String>> {
    let status = query.status();
    let (orders, total) = OrderRepository::new(state.pool())
        .list(status, PAGE_SIZE, Pagination::offset_for(query.page))
        .await?;

    render(&OrdersIndexTemplate {
        chrome: Chrome::new(&admin, &session, "/orders").await?,
        orders,
        statuses: OrderStatus::ALL,
        status,
        pagination: Pagination::new(query.page, total),
    })
}

/// Order detail with the status form.
///
/// GET /orders/{id}
#[instrument(skip(admin, state, session))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Html<String>> {
    let (order, items) = load_order(&state, id).await?;
    render(&OrderShowTemplate {
        chrome: Chrome::new(&admin, &session, "/orders").await?,
        form_status: order.status,
        form_tracking_number: order.tracking_number_or_empty().to_owned(),
        order,
        items,
        statuses: OrderStatus::ALL,
        error: None,
    })
}

/// Change the fulfilment status and tracking number.
///
/// POST /orders/{id}/status
#[instrument(skip(admin, state, session, form))]
pub async fn update_status(
    RequireEditor(admin): RequireEditor,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Response> {
    let status: OrderStatus = form
        .status
        .parse()
        .map_err(|e: bearing_shop_core::ParseStatusError| AppError::BadRequest(e.to_string()))?;

    let change = match validate_status_change(status, &form.tracking_number) {
        Ok(change) => change,
        Err(e) => {
            let (order, items) = load_order(&state, id).await?;
            return render_invalid(&OrderShowTemplate {
                chrome: Chrome::new(&admin, &session, "/orders").await?,
                order,
                items,
                statuses: OrderStatus::ALL,
                form_status: status,
                form_tracking_number: form.tracking_number,
                error: Some(e.to_string()),
            });
        }
    };

    let applied = apply_status_change(&state, OrderId::new(id), &change).await?;
    let message = if !applied.changed {
        "Nothing to update".to_owned()
    } else if applied.emailed {
        format!(
            "{} is now {}; the customer was emailed",
            applied.order.number(),
            applied.order.status.label()
        )
    } else {
        format!(
            "{} is now {}; the customer was notified in their account",
            applied.order.number(),
            applied.order.status.label()
        )
    };
    set_flash(&session, message).await?;
    Ok(Redirect::to(&format!("/orders/{id}")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter_ignores_unknown() {
        let query = OrderListQuery {
            status: Some("shipped".to_owned()),
            page: None,
        };
        assert_eq!(query.status(), Some(OrderStatus::Shipped));

        let query = OrderListQuery {
            status: Some(String::new()),
            page: None,
        };
        assert_eq!(query.status(), None);
    }
}
