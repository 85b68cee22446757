//! Order status changes.
//!
//! A change writes the new status and tracking number, then tells the
//! customer twice: a notification row (picked up by the storefront's live
//! feed) and a status-update email. Email failures are logged and reported
//! back, never rolled back.

use thiserror::Error;

use bearing_shop_core::{OrderId, OrderStatus};

use crate::db::{NotificationRepository, OrderRepository, RepositoryError};
use crate::models::Order;
use crate::services::StatusUpdate;
use crate::state::AppState;

/// A validated status and tracking number pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// Why a status change was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusChangeError {
    #[error("a tracking number (AWB) is required to mark an order {0}")]
    TrackingNumberRequired(OrderStatus),
    #[error("a tracking number can only be set on shipped or delivered orders, not {0}")]
    TrackingNumberNotAccepted(OrderStatus),
}

/// Check a submitted status and tracking number.
///
/// The tracking number is trimmed; blank means none. It is only accepted
/// for statuses that carry one and required when moving to `shipped`.
///
/// # Errors
///
/// Returns [`StatusChangeError`] when the pair is inconsistent.
pub fn validate_status_change(
    status: OrderStatus,
    tracking_number: &str,
) -> Result<StatusChange, StatusChangeError> {
    let tracking_number = tracking_number.trim();
    let tracking_number = (!tracking_number.is_empty()).then(|| tracking_number.to_owned());

    match (&tracking_number, status.accepts_tracking_number()) {
        (Some(_), false) => Err(StatusChangeError::TrackingNumberNotAccepted(status)),
        (None, _) if status.requires_tracking_number() => {
            Err(StatusChangeError::TrackingNumberRequired(status))
        }
        _ => Ok(StatusChange {
            status,
            tracking_number,
        }),
    }
}

/// What happened when a change was applied.
#[derive(Debug)]
pub struct AppliedChange {
    pub order: Order,
    /// False when the submitted values matched the stored ones.
    pub changed: bool,
    /// Whether the status-update email went out.
    pub emailed: bool,
}

fn notification_text(order: &Order) -> (String, String) {
    let title = format!("Order {} {}", order.number(), order.status.as_str());
    let mut message = format!(
        "Your order {} is now {}.",
        order.number(),
        order.status.label().to_lowercase()
    );
    if let Some(awb) = &order.tracking_number {
        message.push_str(&format!(" Tracking number (AWB): {awb}."));
    }
    (title, message)
}

/// Apply a validated change and notify the customer.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order does not exist, or a
/// database error if the update or the notification insert fails.
pub async fn apply_status_change(
    state: &AppState,
    id: OrderId,
    change: &StatusChange,
) -> Result<AppliedChange, RepositoryError> {
    let orders = OrderRepository::new(state.pool());
    let current = orders.get(id).await?.ok_or(RepositoryError::NotFound)?;

    if current.status == change.status && current.tracking_number == change.tracking_number {
        return Ok(AppliedChange {
            order: current,
            changed: false,
            emailed: false,
        });
    }

    let order = orders
        .update_status(id, change.status, change.tracking_number.as_deref())
        .await?;

    let order_path = format!("/account/orders/{}", order.id);
    let (title, message) = notification_text(&order);
    NotificationRepository::new(state.pool())
        .create(order.user_id, &title, &message, Some(&order_path))
        .await?;

    let emailed = match state.email() {
        Some(email) => {
            let update = StatusUpdate {
                order_number: order.number(),
                customer_name: order.shipping_address.full_name.clone(),
                status_label: order.status.label().to_owned(),
                tracking_number: order.tracking_number.clone(),
                order_url: state.config().storefront_url(&order_path),
            };
            match email.send_status_update(&order.email, &update).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!(order_id = %order.id, error = %e, "Failed to send status update email");
                    false
                }
            }
        }
        None => false,
    };

    tracing::info!(
        order_id = %order.id,
        from = %current.status,
        to = %order.status,
        emailed,
        "Order status changed"
    );
    Ok(AppliedChange {
        order,
        changed: true,
        emailed,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_requires_tracking_number() {
        assert_eq!(
            validate_status_change(OrderStatus::Shipped, "  "),
            Err(StatusChangeError::TrackingNumberRequired(OrderStatus::Shipped))
        );

        let change = validate_status_change(OrderStatus::Shipped, " AWB123 ").unwrap();
        assert_eq!(change.tracking_number.as_deref(), Some("AWB123"));
    }

    #[test]
    fn test_tracking_number_rejected_before_shipping() {
        assert_eq!(
            validate_status_change(OrderStatus::Processing, "AWB123"),
            Err(StatusChangeError::TrackingNumberNotAccepted(OrderStatus::Processing))
        );
        assert_eq!(
            validate_status_change(OrderStatus::Processing, "")
                .unwrap()
                .tracking_number,
            None
        );
    }

    #[test]
    fn test_delivered_keeps_optional_tracking_number() {
        assert!(validate_status_change(OrderStatus::Delivered, "").is_ok());
        assert_eq!(
            validate_status_change(OrderStatus::Delivered, "AWB9")
                .unwrap()
                .tracking_number
                .as_deref(),
            Some("AWB9")
        );
    }

    #[test]
    fn test_cancelling_clears_nothing_silently() {
        assert!(matches!(
            validate_status_change(OrderStatus::Cancelled, "AWB9"),
            Err(StatusChangeError::TrackingNumberNotAccepted(OrderStatus::Cancelled))
        ));
    }
}
