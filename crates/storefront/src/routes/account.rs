//! Account route handlers.
//!
//! These routes require authentication. A customer can only see their own
//! orders; anyone else's order ID is a 404.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::instrument;

use bearing_shop_core::{OrderId, OrderStatus, PaymentStatus};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderItem};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Order row display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i32,
    pub number: String,
    pub placed_on: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: String,
    pub tracking_number: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            number: order.number(),
            placed_on: order.created_at.format("%d %b %Y").to_string(),
            status: order.status,
            payment_status: order.payment_status,
            total: order.total_money().display(),
            tracking_number: order.tracking_number.clone(),
        }
    }
}

/// Order line display data.
#[derive(Clone)]
pub struct OrderLineView {
    pub product_id: Option<i32>,
    pub part_number: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
    pub image: Option<String>,
}

impl OrderLineView {
    fn new(order: &Order, item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id.map(|id| id.as_i32()),
            part_number: item.part_number.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: order.money(item.unit_price).display(),
            line_total: order.money(item.line_total()).display(),
            image: item.image.clone(),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderView,
    pub lines: Vec<OrderLineView>,
    pub address: Vec<String>,
    pub phone: String,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub notes: Option<String>,
}

/// The account landing page is the order history.
pub async fn index(RequireAuth(_user): RequireAuth) -> impl IntoResponse {
    Redirect::to("/account/orders")
}

/// Display the customer's orders, newest first.
#[instrument(skip(state, user, layout), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(OrdersTemplate {
        layout,
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Display one of the customer's orders.
#[instrument(skip(state, user, layout), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    layout: Layout,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_for_user(OrderId::new(id), user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = repo.items(order.id).await?;

    Ok(OrderTemplate {
        layout,
        lines: items.iter().map(|i| OrderLineView::new(&order, i)).collect(),
        address: order.shipping_address.lines(),
        phone: order.shipping_address.phone.clone(),
        subtotal: order.money(order.subtotal).display(),
        shipping: order.money(order.shipping).display(),
        tax: order.money(order.tax).display(),
        notes: order.notes.clone(),
        order: OrderView::from(&order),
    })
}
