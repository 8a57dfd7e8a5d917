//! # Order Error Types
//!
//! Typed error handling for the petal-cart order engine.
//! All fallible operations return `Result<T, OrderError>`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for all order operations
#[derive(Debug, Error)]
pub enum OrderError {
    /// Configuration errors (missing keys, invalid tier table)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Quote requested without a destination address
    #[error("Destination address is required")]
    MissingDestination,

    /// Destination could not be resolved to a usable distance
    #[error("Invalid destination: {details}")]
    InvalidDestination { details: String },

    /// Card message exceeds the allowed length
    #[error("Card message too long: {length} characters (max {max})")]
    CardMessageTooLong { length: usize, max: usize },

    /// Price mismatch or invalid amount
    #[error("Invalid price: {message}")]
    InvalidPrice { message: String },

    /// Currency not supported or mixed within one cart
    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    /// Requested destination is beyond the largest delivery tier
    #[error("Out of delivery area: {distance_km:.1} km")]
    OutOfArea { distance_km: f64 },

    /// Item's fulfillment mode disagrees with the cart's fixed mode
    #[error("Cart delivery mode conflict: cart is {cart_mode}, item is {item_mode}")]
    DeliveryModeConflict {
        cart_mode: &'static str,
        item_mode: &'static str,
    },

    /// External collaborator API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// External collaborator unreachable
    #[error("Service unavailable [{service}]: {message}")]
    ServiceUnavailable { service: String, message: String },

    /// External collaborator call exceeded its bounded timeout
    #[error("Gateway timeout [{service}]")]
    GatewayTimeout { service: String },

    /// Payment was declined; the checkout session stays re-attemptable
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Checkout session expired or not found
    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    /// Checkout step transition not permitted from the current step
    #[error("Invalid checkout transition from {from}: {message}")]
    InvalidTransition { from: &'static str, message: String },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse partition of errors, surfaced in every API error body so
/// callers can tell a retryable integration failure from a deterministic
/// domain rejection without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller sent something malformed or incomplete; correct and resend
    Validation,
    /// A collaborator misbehaved; retrying may succeed
    Integration,
    /// The request is well-formed but the domain forbids it
    DomainPolicy,
    /// The payer's bank said no; the session remains re-attemptable
    PaymentDeclined,
    /// Our fault
    Internal,
}

impl OrderError {
    /// Classify this error into the §7 taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::InvalidRequest(_)
            | OrderError::MissingDestination
            | OrderError::InvalidDestination { .. }
            | OrderError::CardMessageTooLong { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::UnsupportedCurrency { .. }
            | OrderError::WebhookVerificationFailed(_)
            | OrderError::WebhookParseError(_)
            | OrderError::SessionNotFound { .. }
            | OrderError::InvalidTransition { .. } => ErrorKind::Validation,
            OrderError::ProviderError { .. }
            | OrderError::ServiceUnavailable { .. }
            | OrderError::GatewayTimeout { .. } => ErrorKind::Integration,
            OrderError::OutOfArea { .. } | OrderError::DeliveryModeConflict { .. } => {
                ErrorKind::DomainPolicy
            }
            OrderError::PaymentDeclined { .. } => ErrorKind::PaymentDeclined,
            OrderError::Configuration(_)
            | OrderError::Internal(_)
            | OrderError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderError::ProviderError { .. }
                | OrderError::ServiceUnavailable { .. }
                | OrderError::GatewayTimeout { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::Configuration(_) => 500,
            OrderError::InvalidRequest(_) => 400,
            OrderError::MissingDestination => 400,
            OrderError::InvalidDestination { .. } => 400,
            OrderError::CardMessageTooLong { .. } => 400,
            OrderError::InvalidPrice { .. } => 400,
            OrderError::UnsupportedCurrency { .. } => 400,
            OrderError::OutOfArea { .. } => 400,
            OrderError::DeliveryModeConflict { .. } => 409,
            OrderError::ProviderError { .. } => 502,
            OrderError::ServiceUnavailable { .. } => 503,
            OrderError::GatewayTimeout { .. } => 504,
            OrderError::PaymentDeclined { .. } => 402,
            OrderError::WebhookVerificationFailed(_) => 401,
            OrderError::WebhookParseError(_) => 400,
            OrderError::SessionNotFound { .. } => 404,
            OrderError::InvalidTransition { .. } => 409,
            OrderError::Internal(_) => 500,
            OrderError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for order operations
pub type OrderResult<T> = Result<T, OrderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(OrderError::ServiceUnavailable {
            service: "distance-matrix".into(),
            message: "connect refused".into()
        }
        .is_retryable());
        assert!(OrderError::GatewayTimeout {
            service: "stripe".into()
        }
        .is_retryable());
        assert!(!OrderError::OutOfArea { distance_km: 25.0 }.is_retryable());
        assert!(!OrderError::InvalidRequest("bad data".into()).is_retryable());
    }

    #[test]
    fn test_kinds_are_distinguishable() {
        assert_eq!(
            OrderError::OutOfArea { distance_km: 25.0 }.kind(),
            ErrorKind::DomainPolicy
        );
        assert_eq!(
            OrderError::DeliveryModeConflict {
                cart_mode: "delivery",
                item_mode: "pickup"
            }
            .kind(),
            ErrorKind::DomainPolicy
        );
        assert_eq!(
            OrderError::ServiceUnavailable {
                service: "distance-matrix".into(),
                message: "down".into()
            }
            .kind(),
            ErrorKind::Integration
        );
        assert_eq!(OrderError::MissingDestination.kind(), ErrorKind::Validation);
        assert_eq!(
            OrderError::PaymentDeclined {
                reason: "insufficient funds".into()
            }
            .kind(),
            ErrorKind::PaymentDeclined
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(OrderError::MissingDestination.status_code(), 400);
        assert_eq!(
            OrderError::DeliveryModeConflict {
                cart_mode: "delivery",
                item_mode: "pickup"
            }
            .status_code(),
            409
        );
        assert_eq!(
            OrderError::PaymentDeclined {
                reason: "card_declined".into()
            }
            .status_code(),
            402
        );
        assert_eq!(
            OrderError::GatewayTimeout {
                service: "stripe".into()
            }
            .status_code(),
            504
        );
    }
}
