//! # Request Handlers
//!
//! Axum request handlers for the order API: delivery quotes, cart
//! mutation, and the checkout flow. Every error is converted to a
//! structured body at this boundary; nothing here panics.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use petal_core::{
    Cart, CartItem, CheckoutSession, ErrorKind, OrderError, Price, RecipientInfo, SenderInfo,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: ErrorKind,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, kind: ErrorKind, code: u16) -> Self {
        Self {
            error: error.into(),
            kind,
            code,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn order_error_to_response(err: OrderError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), err.kind(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Delivery quote query string
#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    #[serde(default)]
    pub destination: Option<String>,
}

/// Delivery quote response
#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteResponse {
    /// Resolved driving distance in kilometers
    pub distance_km: f64,
    /// Delivery fee for that distance
    pub cost: Price,
}

/// Cart snapshot with its computed total
#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    pub guest_id: String,
    pub delivery_mode: Option<bool>,
    pub items: Vec<CartItem>,
    pub total: Price,
}

impl CartResponse {
    fn from_cart(cart: Cart, total: Price) -> Self {
        Self {
            guest_id: cart.guest_id,
            delivery_mode: cart.delivery_mode,
            items: cart.items,
            total,
        }
    }
}

/// Whole-cart replace request
#[derive(Debug, Deserialize)]
pub struct ReplaceCartRequest {
    pub items: Vec<CartItem>,
}

/// Open-checkout request
#[derive(Debug, Deserialize)]
pub struct OpenCheckoutRequest {
    pub guest_id: String,
}

/// Checkout session snapshot returned from every checkout endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub guest_id: String,
    pub step: String,
    pub status: petal_core::CheckoutStatus,
    /// Secret the payer-side SDK needs to confirm the bound authorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Frozen total the authorization is bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Price>,
    /// Last recoverable payment error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
    /// When the session was opened
    pub created_at: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(session: CheckoutSession) -> Self {
        Self {
            session_id: session.id,
            guest_id: session.guest_id,
            step: session.step.name().to_string(),
            status: session.status,
            client_secret: session.client_secret,
            amount: session.frozen_total,
            payment_error: session.payment_error,
            created_at: session.created_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "petal-cart",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Quote a delivery fee for a destination address
#[instrument(skip(state, params))]
pub async fn get_quote(
    State(state): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let destination = params
        .destination
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| order_error_to_response(OrderError::MissingDestination))?;

    let distance_km = state
        .resolver
        .resolve(destination)
        .await
        .map_err(order_error_to_response)?;

    let cost = state
        .pricer
        .price(distance_km)
        .map_err(order_error_to_response)?;

    info!(distance_km, cost = cost.amount, "delivery quote");
    Ok(Json(QuoteResponse { distance_km, cost }))
}

/// Fetch a guest's cart with its computed total
pub async fn get_cart(
    State(state): State<AppState>,
    Path(guest_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let store = state.cart_store();
    let cart = store.get(&guest_id).await.map_err(order_error_to_response)?;
    let total = cart.total(store.currency());
    Ok(Json(CartResponse::from_cart(cart, total)))
}

/// Fetch only the server-computed total
pub async fn cart_total(
    State(state): State<AppState>,
    Path(guest_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total = state
        .cart_store()
        .total(&guest_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(serde_json::json!({
        "guest_id": guest_id,
        "total": total,
    })))
}

/// Append one item to a guest's cart
#[instrument(skip(state, item), fields(guest_id = %guest_id, product_id = %item.product_id))]
pub async fn append_cart_item(
    State(state): State<AppState>,
    Path(guest_id): Path<String>,
    Json(item): Json<CartItem>,
) -> Result<Json<CartResponse>, ApiError> {
    let store = state.cart_store();
    let cart = store
        .append(&guest_id, item)
        .await
        .map_err(order_error_to_response)?;
    let total = cart.total(store.currency());
    Ok(Json(CartResponse::from_cart(cart, total)))
}

/// Whole-cart replace
#[instrument(skip(state, request), fields(guest_id = %guest_id, items = request.items.len()))]
pub async fn replace_cart(
    State(state): State<AppState>,
    Path(guest_id): Path<String>,
    Json(request): Json<ReplaceCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let store = state.cart_store();
    let cart = store
        .replace(&guest_id, request.items)
        .await
        .map_err(order_error_to_response)?;
    let total = cart.total(store.currency());
    Ok(Json(CartResponse::from_cart(cart, total)))
}

/// Explicit clear; resets the delivery mode
pub async fn clear_cart(
    State(state): State<AppState>,
    Path(guest_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let store = state.cart_store();
    let cart = store
        .clear(&guest_id)
        .await
        .map_err(order_error_to_response)?;
    let total = cart.total(store.currency());
    Ok(Json(CartResponse::from_cart(cart, total)))
}

/// Open a checkout session for a guest's cart
#[instrument(skip(state, request), fields(guest_id = %request.guest_id))]
pub async fn open_checkout(
    State(state): State<AppState>,
    Json(request): Json<OpenCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .open(&request.guest_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Snapshot a checkout session
pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .get(&session_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Submit sender info; advances to recipient collection
#[instrument(skip(state, info), fields(session_id = %session_id))]
pub async fn submit_sender(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(info): Json<SenderInfo>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .submit_sender(&session_id, info)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Submit recipient info; advances to the payment step
#[instrument(skip(state, info), fields(session_id = %session_id))]
pub async fn submit_recipient(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(info): Json<RecipientInfo>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .submit_recipient(&session_id, info)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Enter the payment step: binds one authorization to the frozen total
#[instrument(skip(state), fields(session_id = %session_id))]
pub async fn enter_payment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .enter_payment(&session_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Poll the gateway for an authoritative result
#[instrument(skip(state), fields(session_id = %session_id))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .confirm_payment(&session_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Step backward without losing entered data
pub async fn checkout_back(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let session = state
        .checkout
        .go_back(&session_id)
        .await
        .map_err(order_error_to_response)?;
    Ok(Json(session.into()))
}

/// Handle Stripe webhook deliveries
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            order_error_to_response(OrderError::WebhookVerificationFailed(
                "Missing Stripe-Signature header".to_string(),
            ))
        })?;

    let verifier = state.webhooks.as_ref().ok_or_else(|| {
        order_error_to_response(OrderError::Configuration(
            "Stripe webhooks not configured".to_string(),
        ))
    })?;

    let event = verifier.verify(&body, signature).map_err(|e| {
        error!("Webhook verification failed: {}", e);
        order_error_to_response(e)
    })?;

    info!(
        "Received webhook: type={:?}, id={}",
        event.event_type, event.event_id
    );

    state
        .checkout
        .apply_gateway_event(event)
        .await
        .map_err(order_error_to_response)?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let err = OrderError::OutOfArea { distance_km: 25.0 };
        let (status, Json(body)) = order_error_to_response(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.kind, ErrorKind::DomainPolicy);
        assert_eq!(body.code, 400);
    }

    #[test]
    fn test_integration_errors_map_to_5xx() {
        let err = OrderError::ServiceUnavailable {
            service: "distance-matrix".to_string(),
            message: "down".to_string(),
        };
        let (status, Json(body)) = order_error_to_response(err);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.kind, ErrorKind::Integration);
    }

    #[test]
    fn test_decline_maps_to_402() {
        let err = OrderError::PaymentDeclined {
            reason: "insufficient funds".to_string(),
        };
        let (status, Json(body)) = order_error_to_response(err);
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body.kind, ErrorKind::PaymentDeclined);
    }
}
