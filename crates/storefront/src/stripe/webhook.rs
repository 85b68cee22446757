//! Stripe webhook signature verification and event envelope.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use super::PaymentIntent;

/// Maximum age of a signed webhook, in seconds.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("missing or malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfRange,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("invalid signing secret")]
    InvalidSecret,
}

/// Verify a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`) against the
/// raw request body.
///
/// The signed payload is `"{t}.{body}"` hashed with HMAC-SHA256. Any of the
/// `v1` signatures may match (Stripe sends several while a secret rolls).
///
/// # Errors
///
/// Returns `WebhookError` if the header is malformed, the timestamp is more
/// than [`TOLERANCE_SECS`] away from `now`, or no signature matches.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }

    let expected = compute_signature(secret, timestamp, body)?;
    if signatures
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        tracing::debug!("Stripe signature verified");
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{body}"`.
///
/// # Errors
///
/// Returns `WebhookError::InvalidSecret` if the key is rejected by HMAC.
pub fn compute_signature(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// A webhook event. Only `payment_intent.*` payloads are decoded.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode the event object as a payment intent.
    #[must_use]
    pub fn payment_intent(&self) -> Option<PaymentIntent> {
        if !self.event_type.starts_with("payment_intent.") {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bearing_shop_core::OrderId;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_767_225_600;

    fn header_for(body: &[u8], timestamp: i64) -> String {
        format!(
            "t={timestamp},v1={}",
            compute_signature(SECRET, timestamp, body).unwrap()
        )
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        assert_eq!(verify_signature(SECRET, &header_for(body, NOW), body, NOW), Ok(()));
    }

    #[test]
    fn test_any_v1_signature_may_match() {
        let body = b"{}";
        let header = format!(
            "t={NOW},v1=deadbeef,v1={}",
            compute_signature(SECRET, NOW, body).unwrap()
        );
        assert_eq!(verify_signature(SECRET, &header, body, NOW), Ok(()));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let header = header_for(b"{\"amount\":100}", NOW);
        assert_eq!(
            verify_signature(SECRET, &header, b"{\"amount\":1}", NOW),
            Err(WebhookError::SignatureMismatch)
        );
    }

    #[test]
    fn test_stale_timestamp_is_rejected() {
        let body = b"{}";
        let header = header_for(body, NOW - TOLERANCE_SECS - 1);
        assert_eq!(
            verify_signature(SECRET, &header, body, NOW),
            Err(WebhookError::TimestampOutOfRange)
        );
        let header = header_for(body, NOW - TOLERANCE_SECS);
        assert_eq!(verify_signature(SECRET, &header, body, NOW), Ok(()));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(
            verify_signature(SECRET, "v1=abc", b"{}", NOW),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_signature(SECRET, &format!("t={NOW}"), b"{}", NOW),
            Err(WebhookError::MalformedHeader)
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
    }

    #[test]
    fn test_event_payment_intent() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {
                "id": "pi_1", "amount": 500, "currency": "eur", "status": "succeeded",
                "metadata": {"order_id": "7"}
            }}
        }))
        .unwrap();

        let intent = event.payment_intent().unwrap();
        assert_eq!(intent.order_id(), Some(OrderId::new(7)));

        let other: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_2", "type": "charge.refunded", "data": {"object": {}}
        }))
        .unwrap();
        assert!(other.payment_intent().is_none());
    }
}
