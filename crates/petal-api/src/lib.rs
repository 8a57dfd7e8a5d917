//! # petal-api
//!
//! HTTP API layer for petal-cart-rs: delivery quotes, cart mutation,
//! and the checkout flow, exposed over axum.

pub mod handlers;
pub mod routes;
pub mod state;
