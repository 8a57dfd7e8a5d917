//! # Routes
//!
//! Axum router configuration for the order API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Delivery:
///   - GET  /api/v1/delivery/quote?destination= - Quote a delivery fee
///
/// - Cart:
///   - GET    /api/v1/cart/{guest_id} - Fetch cart with total
///   - PUT    /api/v1/cart/{guest_id} - Whole-cart replace
///   - DELETE /api/v1/cart/{guest_id} - Explicit clear
///   - POST   /api/v1/cart/{guest_id}/items - Append one item
///   - GET    /api/v1/cart/{guest_id}/total - Server-computed total
///
/// - Checkout:
///   - POST /api/v1/checkout - Open a session
///   - GET  /api/v1/checkout/{session_id} - Session snapshot
///   - POST /api/v1/checkout/{session_id}/sender - Submit sender info
///   - POST /api/v1/checkout/{session_id}/recipient - Submit recipient info
///   - POST /api/v1/checkout/{session_id}/payment - Enter payment
///   - POST /api/v1/checkout/{session_id}/confirm - Poll for result
///   - POST /api/v1/checkout/{session_id}/back - Step backward
///
/// - Webhooks:
///   - POST /webhook/stripe - Stripe webhook handler
pub fn create_router(state: AppState) -> Router {
    // The storefront is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let delivery_routes = Router::new().route("/quote", get(handlers::get_quote));

    let cart_routes = Router::new()
        .route(
            "/{guest_id}",
            get(handlers::get_cart)
                .put(handlers::replace_cart)
                .delete(handlers::clear_cart),
        )
        .route("/{guest_id}/items", post(handlers::append_cart_item))
        .route("/{guest_id}/total", get(handlers::cart_total));

    let checkout_routes = Router::new()
        .route("/", post(handlers::open_checkout))
        .route("/{session_id}", get(handlers::get_checkout_session))
        .route("/{session_id}/sender", post(handlers::submit_sender))
        .route("/{session_id}/recipient", post(handlers::submit_recipient))
        .route("/{session_id}/payment", post(handlers::enter_payment))
        .route("/{session_id}/confirm", post(handlers::confirm_payment))
        .route("/{session_id}/back", post(handlers::checkout_back));

    let api_routes = Router::new()
        .nest("/delivery", delivery_routes)
        .nest("/cart", cart_routes)
        .nest("/checkout", checkout_routes);

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new().route("/stripe", post(handlers::stripe_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Webhooks
        .nest("/webhook", webhook_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
