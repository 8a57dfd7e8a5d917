//! # Stripe Webhook Verification
//!
//! Verifies `Stripe-Signature` headers and parses `payment_intent.*`
//! events into the core's `GatewayEvent` model. The checkout flow uses
//! these events as the authoritative server-side trigger for
//! `Payment → Complete`.

use crate::config::StripeConfig;
use chrono::{DateTime, Utc};
use petal_core::{GatewayEvent, GatewayEventType, OrderError, OrderResult};
use serde::Deserialize;
use tracing::debug;

/// Events that should be enabled in the Stripe Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.canceled",
];

/// Signature timestamp tolerance in seconds (5 minutes)
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verifies and parses Stripe webhook deliveries
pub struct StripeWebhookVerifier {
    webhook_secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - `Stripe-Signature` header value
    pub fn verify(&self, payload: &[u8], signature: &str) -> OrderResult<GatewayEvent> {
        let sig_parts = parse_signature_header(signature)?;

        // Reject replayed deliveries
        let now = Utc::now().timestamp();
        if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(OrderError::WebhookVerificationFailed(
                "Timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!(
            "{}.{}",
            sig_parts.timestamp,
            String::from_utf8_lossy(payload)
        );
        let expected_sig = compute_hmac_sha256(&self.webhook_secret, &signed_payload);

        let valid = sig_parts
            .signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected_sig));

        if !valid {
            return Err(OrderError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            OrderError::WebhookParseError(format!("Failed to parse webhook: {e}"))
        })?;

        debug!("Verified Stripe webhook: type={}", event.event_type);

        let event_type = match event.event_type.as_str() {
            "payment_intent.succeeded" => GatewayEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => GatewayEventType::PaymentFailed,
            "payment_intent.canceled" => GatewayEventType::PaymentCanceled,
            other => GatewayEventType::Unknown(other.to_string()),
        };

        let authorization_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .map(String::from);

        let amount = event.data.object.get("amount").and_then(|v| v.as_i64());

        let failure_reason = event
            .data
            .object
            .get("last_payment_error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .map(String::from);

        Ok(GatewayEvent {
            event_id: event.id,
            event_type,
            provider: "stripe".to_string(),
            authorization_id,
            amount,
            failure_reason,
            raw_data: Some(serde_json::Value::Object(event.data.object)),
            timestamp: DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> OrderResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        OrderError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(OrderError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
