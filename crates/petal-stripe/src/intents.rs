//! # Stripe PaymentIntents Gateway
//!
//! Implements `petal_core::PaymentGateway` over the PaymentIntents API:
//! create an intent bound to the frozen cart total, poll its
//! authoritative status, and cancel it when checkout rebinds to a
//! changed total. The payer confirms the intent with the client secret
//! on their side; this gateway never sees card data.

use crate::config::StripeConfig;
use async_trait::async_trait;
use petal_core::{
    Authorization, AuthorizationStatus, OrderError, OrderResult, PaymentGateway, Price,
    MIN_CHARGE_MINOR_UNITS,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

/// Bounded timeout for gateway calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Stripe PaymentIntents gateway
pub struct StripeIntentGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeIntentGateway {
    /// Create a new gateway
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> OrderResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Publishable key the payer-side SDK pairs with the client secret
    pub fn publishable_key(&self) -> &str {
        &self.config.publishable_key
    }

    fn map_transport_error(e: reqwest::Error) -> OrderError {
        if e.is_timeout() {
            OrderError::GatewayTimeout {
                service: "stripe".to_string(),
            }
        } else {
            OrderError::ServiceUnavailable {
                service: "stripe".to_string(),
                message: e.to_string(),
            }
        }
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> OrderError {
        if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(body) {
            return OrderError::ProviderError {
                provider: "stripe".to_string(),
                message: error_response.error.message,
            };
        }
        OrderError::ProviderError {
            provider: "stripe".to_string(),
            message: format!("HTTP {status}: {body}"),
        }
    }

    async fn get_intent(&self, intent_id: &str) -> OrderResult<StripeIntentResponse> {
        let url = format!(
            "{}/v1/payment_intents/{}",
            self.config.api_base_url, intent_id
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_transport_error)?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(Self::parse_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            OrderError::Serialization(format!("Failed to parse Stripe response: {e}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeIntentGateway {
    #[instrument(skip(self, amount), fields(amount = amount.amount))]
    async fn create_authorization(
        &self,
        amount: &Price,
        idempotency_key: &str,
    ) -> OrderResult<Authorization> {
        if amount.amount < MIN_CHARGE_MINOR_UNITS {
            return Err(OrderError::InvalidPrice {
                message: format!(
                    "amount must be at least {MIN_CHARGE_MINOR_UNITS} cents, got {}",
                    amount.amount
                ),
            });
        }

        let form_params: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.amount.to_string()),
            ("currency".to_string(), amount.currency.as_str().to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
        ];

        debug!("Creating Stripe payment intent for {}", amount.display());

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", idempotency_key)
            .form(&form_params)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_transport_error)?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(Self::parse_error(status, &body));
        }

        let intent: StripeIntentResponse = serde_json::from_str(&body).map_err(|e| {
            OrderError::Serialization(format!("Failed to parse Stripe response: {e}"))
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| OrderError::ProviderError {
            provider: "stripe".to_string(),
            message: "payment intent missing client_secret".to_string(),
        })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(Authorization {
            id: intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn confirm_authorization(
        &self,
        authorization_id: &str,
    ) -> OrderResult<AuthorizationStatus> {
        let intent = self.get_intent(authorization_id).await?;

        let status = match intent.status.as_str() {
            "succeeded" => AuthorizationStatus::Succeeded,
            "canceled" => AuthorizationStatus::Canceled,
            // After a failed attempt the intent drops back to
            // requires_payment_method with the decline recorded on it
            "requires_payment_method" if intent.last_payment_error.is_some() => {
                let reason = intent
                    .last_payment_error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "payment declined".to_string());
                AuthorizationStatus::Declined { reason }
            }
            _ => AuthorizationStatus::Pending,
        };

        debug!("Payment intent {} status: {:?}", authorization_id, status);
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn cancel_authorization(&self, authorization_id: &str) -> OrderResult<()> {
        let url = format!(
            "{}/v1/payment_intents/{}/cancel",
            self.config.api_base_url, authorization_id
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::map_transport_error)?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(Self::parse_error(status, &body));
        }

        info!("Canceled Stripe payment intent: {}", authorization_id);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
struct StripePaymentError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use petal_core::Currency;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> StripeIntentGateway {
        StripeIntentGateway::new(
            StripeConfig::new("sk_test_abc", "pk_test_xyz", "whsec_secret")
                .with_api_base_url(server.uri()),
        )
    }

    #[tokio::test]
    async fn test_create_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Idempotency-Key", "sess-1:5800"))
            .and(body_string_contains("amount=5800"))
            .and(body_string_contains("currency=cad"))
            .and(body_string_contains("payment_method_types"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "status": "requires_payment_method",
                "client_secret": "pi_123_secret_abc"
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let auth = gateway
            .create_authorization(&Price::from_cents(5800, Currency::CAD), "sess-1:5800")
            .await
            .unwrap();
        assert_eq!(auth.id, "pi_123");
        assert_eq!(auth.client_secret, "pi_123_secret_abc");
    }

    #[tokio::test]
    async fn test_create_rejects_below_minimum() {
        let server = MockServer::start().await;
        let gateway = gateway_for(&server);
        let err = gateway
            .create_authorization(&Price::from_cents(49, Currency::CAD), "sess-1:49")
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidPrice { .. }));
    }

    #[tokio::test]
    async fn test_create_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway
            .create_authorization(&Price::from_cents(5800, Currency::CAD), "sess-1:5800")
            .await
            .unwrap_err();
        match err {
            OrderError::ProviderError { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_confirm_maps_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_ok", "status": "succeeded"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_declined"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_declined",
                "status": "requires_payment_method",
                "last_payment_error": { "message": "Your card has insufficient funds." }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_fresh", "status": "requires_payment_method"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_gone", "status": "canceled"
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        assert_eq!(
            gateway.confirm_authorization("pi_ok").await.unwrap(),
            AuthorizationStatus::Succeeded
        );
        assert_eq!(
            gateway.confirm_authorization("pi_declined").await.unwrap(),
            AuthorizationStatus::Declined {
                reason: "Your card has insufficient funds.".to_string()
            }
        );
        assert_eq!(
            gateway.confirm_authorization("pi_fresh").await.unwrap(),
            AuthorizationStatus::Pending
        );
        assert_eq!(
            gateway.confirm_authorization("pi_gone").await.unwrap(),
            AuthorizationStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_cancel_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_123/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123", "status": "canceled"
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        gateway.cancel_authorization("pi_123").await.unwrap();
    }
}
