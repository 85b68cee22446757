//! Stripe REST client for card payments.
//!
//! # Architecture
//!
//! - Server creates a `PaymentIntent` per order; the browser confirms it with
//!   the Payment Element using the intent's client secret
//! - Stripe redirects to `/checkout/complete`, which retrieves the intent
//! - `payment_intent.*` webhooks keep the order's payment status in sync
//!   when the customer never returns to the site
//!
//! Only the two endpoints the checkout needs are wrapped. Requests are
//! form-encoded as Stripe expects.

pub mod webhook;

use std::collections::HashMap;
use std::time::Duration;

use bearing_shop_core::{Currency, OrderId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::config::StripeConfig;

pub use webhook::{WebhookError, WebhookEvent, verify_signature};

/// Metadata key linking a payment intent to its order.
pub const ORDER_ID_METADATA_KEY: &str = "order_id";

/// Errors that can occur when calling Stripe.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe returned an error object.
    #[error("Stripe API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreatePaymentIntent<'a> {
    /// Amount in the currency's minor unit.
    pub amount: i64,
    pub currency: Currency,
    pub order_id: OrderId,
    pub receipt_email: Option<&'a str>,
    pub description: Option<String>,
}

impl CreatePaymentIntent<'_> {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_owned(), self.amount.to_string()),
            ("currency".to_owned(), self.currency.api_code().to_owned()),
            (
                "automatic_payment_methods[enabled]".to_owned(),
                "true".to_owned(),
            ),
            (
                format!("metadata[{ORDER_ID_METADATA_KEY}]"),
                self.order_id.to_string(),
            ),
        ];
        if let Some(email) = self.receipt_email {
            form.push(("receipt_email".to_owned(), email.to_owned()));
        }
        if let Some(description) = &self.description {
            form.push(("description".to_owned(), description.clone()));
        }
        form
    }
}

/// Lifecycle state of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// The last error Stripe recorded for a payment attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The subset of Stripe's `PaymentIntent` object the shop reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<PaymentError>,
}

impl PaymentIntent {
    /// The order this intent pays for, from its metadata.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.metadata
            .get(ORDER_ID_METADATA_KEY)
            .and_then(|v| v.parse::<i32>().ok())
            .map(OrderId::new)
    }

    /// Stripe's customer-facing explanation of the last failure.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.message.as_deref())
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Client for the Stripe REST API.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
        })
    }

    /// Create a payment intent for an order.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if Stripe rejects the request.
    #[instrument(skip(self, params), fields(order_id = %params.order_id, amount = params.amount))]
    pub async fn create_payment_intent(
        &self,
        params: &CreatePaymentIntent<'_>,
    ) -> Result<PaymentIntent, StripeError> {
        let url = format!("{}/v1/payment_intents", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&params.form())
            .send()
            .await?;

        let intent: PaymentIntent = parse_response(response).await?;
        tracing::info!(payment_intent = %intent.id, "Created payment intent");
        Ok(intent)
    }

    /// Retrieve a payment intent by ID.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::Api` if the intent does not exist.
    #[instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.api_base,
            urlencoding::encode(id)
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;

        parse_response(response).await
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StripeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, code) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (
            envelope
                .error
                .message
                .unwrap_or_else(|| "unknown error".to_owned()),
            envelope.error.code,
        ),
        Err(_) => (body.trim().to_owned(), None),
    };
    tracing::warn!(status = status.as_u16(), %message, "Stripe API error");
    Err(StripeError::Api {
        status: status.as_u16(),
        message,
        code,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StripeClient {
        StripeClient::new(&StripeConfig {
            api_base: server.uri(),
            secret_key: SecretString::from("sk_test_123".to_owned()),
            publishable_key: "pk_test_123".to_owned(),
            webhook_secret: SecretString::from("whsec_123".to_owned()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_payment_intent_sends_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("amount=22695"))
            .and(body_string_contains("currency=ron"))
            .and(body_string_contains("metadata%5Border_id%5D=42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_1",
                "amount": 22695,
                "currency": "ron",
                "status": "requires_payment_method",
                "client_secret": "pi_1_secret_abc",
                "metadata": {"order_id": "42"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let intent = client(&server)
            .create_payment_intent(&CreatePaymentIntent {
                amount: 22695,
                currency: Currency::Ron,
                order_id: OrderId::new(42),
                receipt_email: Some("buyer@example.com"),
                description: None,
            })
            .await
            .unwrap();

        assert_eq!(intent.client_secret.as_deref(), Some("pi_1_secret_abc"));
        assert_eq!(intent.status, PaymentIntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.order_id(), Some(OrderId::new(42)));
    }

    #[tokio::test]
    async fn test_retrieve_failed_intent_exposes_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_2",
                "amount": 1000,
                "currency": "eur",
                "status": "requires_payment_method",
                "last_payment_error": {"code": "card_declined", "message": "Your card was declined."}
            })))
            .mount(&server)
            .await;

        let intent = client(&server).retrieve_payment_intent("pi_2").await.unwrap();
        assert_eq!(intent.failure_message(), Some("Your card was declined."));
        assert_eq!(intent.order_id(), None);
    }

    #[tokio::test]
    async fn test_api_error_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": "resource_missing", "message": "No such payment_intent: 'pi_x'"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).retrieve_payment_intent("pi_x").await.unwrap_err();
        assert!(matches!(
            err,
            StripeError::Api { status: 404, code: Some(ref c), .. } if c == "resource_missing"
        ));
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: PaymentIntentStatus = serde_json::from_str("\"brand_new_state\"").unwrap();
        assert_eq!(status, PaymentIntentStatus::Unknown);
    }
}
