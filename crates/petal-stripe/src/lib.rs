//! # petal-stripe
//!
//! Stripe integration for petal-cart-rs.
//!
//! This crate provides:
//!
//! 1. **StripeIntentGateway** - PaymentIntents implementation of the
//!    core `PaymentGateway` trait: create an intent bound to the frozen
//!    cart total, poll its status, cancel on rebind.
//! 2. **StripeWebhookVerifier** - signature verification and parsing of
//!    `payment_intent.*` events into `GatewayEvent`s the checkout flow
//!    can apply.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use petal_stripe::StripeIntentGateway;
//! use petal_core::{PaymentGateway, Price, Currency};
//!
//! let gateway = StripeIntentGateway::from_env()?;
//!
//! let auth = gateway
//!     .create_authorization(&Price::from_cents(5800, Currency::CAD), "sess-1:5800")
//!     .await?;
//!
//! // Hand auth.client_secret to the payer-side SDK
//! ```

pub mod config;
pub mod intents;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use intents::StripeIntentGateway;
pub use webhook::{StripeWebhookVerifier, REQUIRED_WEBHOOK_EVENTS};
