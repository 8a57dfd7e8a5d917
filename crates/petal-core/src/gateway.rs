//! # Payment Gateway Trait
//!
//! External payment collaborator: creates an authorization bound to a
//! specific amount, reports its authoritative status, and cancels it
//! when checkout must rebind to a changed total. Implementations:
//! Stripe PaymentIntents (`petal-stripe`).

use crate::error::OrderResult;
use crate::money::Price;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Smallest amount the gateway will authorize, in minor units
pub const MIN_CHARGE_MINOR_UNITS: i64 = 50;

/// A pending charge bound to a specific amount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    /// Gateway's identifier for the pending charge
    pub id: String,
    /// Secret the payer-side SDK uses to confirm the charge
    pub client_secret: String,
}

/// Authoritative state of an authorization as the gateway reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// Awaiting payer confirmation
    Pending,
    /// Charge captured; the order is paid
    Succeeded,
    /// Payer's bank refused; re-attemptable
    Declined { reason: String },
    /// Authorization voided or expired; a new one is required
    Canceled,
}

/// Payment collaborator consumed by checkout orchestration.
///
/// Amounts are minor currency units; implementations reject amounts
/// below [`MIN_CHARGE_MINOR_UNITS`]. `idempotency_key` makes repeated
/// creation requests for one session replay instead of double-charging.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create one authorization bound to `amount`
    async fn create_authorization(
        &self,
        amount: &Price,
        idempotency_key: &str,
    ) -> OrderResult<Authorization>;

    /// Fetch the authoritative status of an authorization
    async fn confirm_authorization(&self, authorization_id: &str)
        -> OrderResult<AuthorizationStatus>;

    /// Void a pending authorization (total changed; rebinding)
    async fn cancel_authorization(&self, authorization_id: &str) -> OrderResult<()>;

    /// Provider name, for logging and webhook routing
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway handle (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Gateway event types the checkout flow reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventType {
    /// Payment captured
    PaymentSucceeded,
    /// Payment attempt failed
    PaymentFailed,
    /// Authorization voided or expired
    PaymentCanceled,
    /// Unknown event (passthrough)
    Unknown(String),
}

/// A verified event pushed by the gateway (webhook)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Event ID from the provider
    pub event_id: String,

    /// Event type
    pub event_type: GatewayEventType,

    /// Provider name
    pub provider: String,

    /// Authorization the event concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_id: Option<String>,

    /// Amount involved, in minor units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    /// Human-readable failure reason, when the gateway supplies one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Raw event payload (for debugging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}
