//! Checkout: turn a cart into an order and a Stripe payment intent, and
//! reconcile the order with the intent's outcome.

use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;

use bearing_shop_core::order::ShippingAddress;
use bearing_shop_core::{
    Cart, CheckoutPolicy, CheckoutTotals, Currency, PaymentStatus, ProductId,
};

use crate::db::{
    NotificationRepository, OrderRepository, ProductRepository, RepositoryError,
    UserSettingsRepository,
};
use crate::models::{CurrentUser, NewOrder, NewOrderItem, Order, OrderItem};
use crate::services::email::{EmailService, OrderSummary};
use crate::stripe::{
    CreatePaymentIntent, PaymentIntent, PaymentIntentStatus, StripeClient, StripeError,
};

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("missing shipping details: {}", .0.join(", "))]
    MissingAddress(Vec<&'static str>),

    #[error("order total cannot be charged")]
    InvalidAmount,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Stripe(#[from] StripeError),
}

/// An order that is waiting for the customer to pay.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub client_secret: String,
}

/// What a payment intent means for its order.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// The order is paid. `newly_paid` is true only for the call that made
    /// the transition.
    Paid { order: Order, newly_paid: bool },
    /// Stripe is still processing the payment.
    Pending { order: Order },
    /// Payment failed or was abandoned; the message comes from Stripe.
    Failed {
        order: Order,
        message: Option<String>,
    },
}

impl PaymentOutcome {
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Paid { order, .. } | Self::Pending { order } | Self::Failed { order, .. } => order,
        }
    }
}

/// Build the order rows for a cart.
///
/// Unit prices and totals are converted to `currency`. Pure so it can be
/// tested without a database.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or `CheckoutError::MissingAddress`.
pub fn build_order(
    user: &CurrentUser,
    cart: &Cart,
    address: ShippingAddress,
    currency: Currency,
    policy: &CheckoutPolicy,
    notes: Option<String>,
) -> Result<NewOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let address = address.trimmed();
    let missing = address.missing_fields();
    if !missing.is_empty() {
        return Err(CheckoutError::MissingAddress(missing));
    }

    let items = cart
        .items
        .iter()
        .map(|item| NewOrderItem {
            product_id: item.id,
            part_number: item.part_number.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price_in(currency),
            quantity: i32::try_from(item.quantity).unwrap_or(i32::MAX),
            image: item.image.clone(),
        })
        .collect();

    Ok(NewOrder {
        user_id: user.id,
        email: user.email.clone(),
        totals: CheckoutTotals::compute(cart, policy, currency),
        shipping_address: address,
        notes: notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
        items,
    })
}

/// What to do with an order given its payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PaymentDecision {
    /// Mark paid unless another delivery already did.
    MarkPaid,
    AlreadyPaid,
    Processing,
    /// `record` is set when Stripe gave a reason or the intent was canceled;
    /// an intent still awaiting a payment method leaves the order as is.
    Fail {
        message: Option<String>,
        record: bool,
    },
}

fn decide_payment(
    status: PaymentIntentStatus,
    already_paid: bool,
    failure_message: Option<&str>,
) -> PaymentDecision {
    match status {
        PaymentIntentStatus::Succeeded => PaymentDecision::MarkPaid,
        _ if already_paid => PaymentDecision::AlreadyPaid,
        PaymentIntentStatus::Processing => PaymentDecision::Processing,
        _ => PaymentDecision::Fail {
            message: failure_message.map(str::to_owned),
            record: failure_message.is_some() || status == PaymentIntentStatus::Canceled,
        },
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    stripe: &'a StripeClient,
    policy: &'a CheckoutPolicy,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: &'a StripeClient, policy: &'a CheckoutPolicy) -> Self {
        Self {
            pool,
            stripe,
            policy,
        }
    }

    /// Refresh cart prices from the catalog and drop products that are gone
    /// or inactive. Returns the dropped product IDs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the lookup fails.
    pub async fn reprice(&self, cart: &mut Cart) -> Result<Vec<ProductId>, RepositoryError> {
        let products = ProductRepository::new(self.pool)
            .get_many_active(&cart.product_ids())
            .await?;
        let prices: HashMap<ProductId, _> = products.iter().map(|p| (p.id, p.price)).collect();
        let dropped = cart.reprice(&prices);
        if !dropped.is_empty() {
            tracing::info!(dropped = ?dropped, "Removed unavailable products from cart");
        }
        Ok(dropped)
    }

    /// Create the order and its payment intent.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if validation, the insert or Stripe fails.
    /// An order whose intent could not be created stays `unpaid`.
    pub async fn place_order(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        address: ShippingAddress,
        currency: Currency,
        notes: Option<String>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let new_order = build_order(user, cart, address, currency, self.policy, notes)?;
        let amount = new_order
            .totals
            .total_money()
            .minor_units()
            .filter(|a| *a > 0)
            .ok_or(CheckoutError::InvalidAmount)?;

        let orders = OrderRepository::new(self.pool);
        let order = orders.create(&new_order).await?;

        let intent = self
            .stripe
            .create_payment_intent(&CreatePaymentIntent {
                amount,
                currency,
                order_id: order.id,
                receipt_email: Some(user.email.as_str()),
                description: Some(format!("Order {}", order.number())),
            })
            .await?;
        let client_secret = intent.client_secret.clone().ok_or_else(|| StripeError::Api {
            status: 200,
            message: "payment intent has no client secret".to_owned(),
            code: None,
        })?;
        orders.set_payment_intent(order.id, &intent.id).await?;

        let items = orders.items(order.id).await?;
        Ok(PlacedOrder {
            order,
            items,
            client_secret,
        })
    }

    /// Apply a payment intent's state to its order.
    ///
    /// Returns `None` when no order references the intent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an update fails.
    pub async fn apply_payment(
        &self,
        intent: &PaymentIntent,
    ) -> Result<Option<PaymentOutcome>, RepositoryError> {
        let orders = OrderRepository::new(self.pool);
        let Some(order) = orders.get_by_payment_intent(&intent.id).await? else {
            tracing::warn!(payment_intent = %intent.id, "No order for payment intent");
            return Ok(None);
        };

        let decision = decide_payment(intent.status, order.is_paid(), intent.failure_message());
        let outcome = match decision {
            PaymentDecision::MarkPaid => match orders.mark_paid(order.id).await? {
                Some(updated) => PaymentOutcome::Paid {
                    order: updated,
                    newly_paid: true,
                },
                None => PaymentOutcome::Paid {
                    order,
                    newly_paid: false,
                },
            },
            PaymentDecision::AlreadyPaid => PaymentOutcome::Paid {
                order,
                newly_paid: false,
            },
            PaymentDecision::Processing => {
                orders
                    .set_payment_status(order.id, PaymentStatus::Processing)
                    .await?;
                PaymentOutcome::Pending { order }
            }
            PaymentDecision::Fail { message, record } => {
                if record {
                    orders
                        .set_payment_status(order.id, PaymentStatus::Failed)
                        .await?;
                }
                PaymentOutcome::Failed { order, message }
            }
        };
        Ok(Some(outcome))
    }
}

/// Side effects of a newly paid order: clear the mirrored cart, notify the
/// customer and send the payment confirmation.
///
/// Failures are logged and never surface to the caller; the payment itself
/// has already been recorded.
pub async fn after_payment(
    pool: &PgPool,
    email: Option<&EmailService>,
    order: &Order,
    order_url: String,
) {
    if let Err(e) = UserSettingsRepository::new(pool)
        .save_cart(order.user_id, &Cart::new())
        .await
    {
        tracing::warn!(order_id = %order.id, error = %e, "Failed to clear stored cart");
    }

    let message = format!(
        "We received your payment of {} for order {}.",
        order.total_money().display(),
        order.number()
    );
    if let Err(e) = NotificationRepository::new(pool)
        .create(order.user_id, "Payment received", &message, Some(&order_url))
        .await
    {
        tracing::warn!(order_id = %order.id, error = %e, "Failed to create payment notification");
    }

    let Some(email) = email else {
        return;
    };
    let items = match OrderRepository::new(pool).items(order.id).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to load items for email");
            return;
        }
    };
    let summary = OrderSummary::new(order, &items, order_url);
    if let Err(e) = email.send_payment_confirmation(&order.email, &summary).await {
        tracing::error!(order_id = %order.id, error = %e, "Failed to send payment confirmation");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bearing_shop_core::{CartItem, Email, ProfileRole, UserId};
    use rust_decimal::Decimal;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(uuid::Uuid::nil()),
            email: Email::parse("buyer@example.com").unwrap(),
            role: ProfileRole::Customer,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ana Pop".to_owned(),
            line1: "Str. Lunga 1".to_owned(),
            city: "Brasov".to_owned(),
            postal_code: "500000".to_owned(),
            country: "RO".to_owned(),
            ..ShippingAddress::default()
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem {
            id: ProductId::new(1),
            part_number: "6205-2RS".to_owned(),
            name: "Deep groove ball bearing".to_owned(),
            price: Decimal::new(1000, 2),
            quantity: 3,
            image: None,
        });
        cart
    }

    #[test]
    fn test_build_order_totals_and_items() {
        let order = build_order(
            &user(),
            &cart(),
            address(),
            Currency::Usd,
            &CheckoutPolicy::default(),
            Some("  ".to_owned()),
        )
        .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price, Decimal::new(1080, 2));
        assert_eq!(order.items[0].quantity, 3);
        // 30.00 EUR goods + 25.00 shipping + 5.70 tax, in USD
        assert_eq!(order.totals.total, Decimal::new(3240 + 2700 + 616, 2));
        assert_eq!(order.notes, None);
    }

    #[test]
    fn test_order_lines_add_up_to_subtotal() {
        let mut cart = cart();
        cart.add(CartItem {
            id: ProductId::new(2),
            part_number: "NU 2208".to_owned(),
            name: "Cylindrical roller bearing".to_owned(),
            price: Decimal::new(1005, 2),
            quantity: 10,
            image: None,
        });
        let order = build_order(
            &user(),
            &cart,
            address(),
            Currency::Usd,
            &CheckoutPolicy::default(),
            None,
        )
        .unwrap();

        let lines: Decimal = order
            .items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        assert_eq!(order.items[1].unit_price, Decimal::new(1085, 2));
        assert_eq!(lines, order.totals.subtotal);
    }

    #[test]
    fn test_succeeded_intent_marks_paid() {
        assert_eq!(
            decide_payment(PaymentIntentStatus::Succeeded, false, None),
            PaymentDecision::MarkPaid
        );
        // A repeated webhook still goes through the conditional update
        assert_eq!(
            decide_payment(PaymentIntentStatus::Succeeded, true, None),
            PaymentDecision::MarkPaid
        );
    }

    #[test]
    fn test_processing_intent_is_pending() {
        assert_eq!(
            decide_payment(PaymentIntentStatus::Processing, false, None),
            PaymentDecision::Processing
        );
    }

    #[test]
    fn test_paid_order_is_not_downgraded() {
        for status in [
            PaymentIntentStatus::Processing,
            PaymentIntentStatus::RequiresPaymentMethod,
            PaymentIntentStatus::Canceled,
        ] {
            assert_eq!(
                decide_payment(status, true, Some("Your card was declined.")),
                PaymentDecision::AlreadyPaid
            );
        }
    }

    #[test]
    fn test_declined_payment_keeps_stripe_message() {
        assert_eq!(
            decide_payment(
                PaymentIntentStatus::RequiresPaymentMethod,
                false,
                Some("Your card was declined.")
            ),
            PaymentDecision::Fail {
                message: Some("Your card was declined.".to_owned()),
                record: true,
            }
        );
    }

    #[test]
    fn test_unconfirmed_intent_without_error_is_not_recorded() {
        assert_eq!(
            decide_payment(PaymentIntentStatus::RequiresPaymentMethod, false, None),
            PaymentDecision::Fail {
                message: None,
                record: false,
            }
        );
        assert_eq!(
            decide_payment(PaymentIntentStatus::Canceled, false, None),
            PaymentDecision::Fail {
                message: None,
                record: true,
            }
        );
    }

    #[test]
    fn test_build_order_rejects_empty_cart() {
        let err = build_order(
            &user(),
            &Cart::new(),
            address(),
            Currency::Eur,
            &CheckoutPolicy::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[test]
    fn test_build_order_reports_missing_address_fields() {
        let err = build_order(
            &user(),
            &cart(),
            ShippingAddress {
                city: "  ".to_owned(),
                ..address()
            },
            Currency::Eur,
            &CheckoutPolicy::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CheckoutError::MissingAddress(ref f) if f == &vec!["city"]));
        assert_eq!(err.to_string(), "missing shipping details: city");
    }
}
