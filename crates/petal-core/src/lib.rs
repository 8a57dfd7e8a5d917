//! # petal-core
//!
//! Core types and traits for the petal-cart order engine: delivery
//! pricing, cart consistency, and the checkout state machine of an
//! online flower storefront.
//!
//! This crate provides:
//! - `TierTable` and `DeliveryPricer` for distance-banded delivery fees
//! - `DistanceResolver` and the `DistanceClient` trait for turning raw
//!   addresses into distances
//! - `Cart`, `CartItem`, and `CartStore` with the single-delivery-mode
//!   invariant and the authoritative total
//! - `CheckoutSession` and `CheckoutService` for the guarded multi-step
//!   checkout flow
//! - `PaymentGateway` trait for payment providers
//! - `OrderError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use petal_core::{CartStore, CheckoutService, Currency, DeliveryPricer};
//!
//! // Price a quoted distance
//! let cost = pricer.price(7.2)?;
//!
//! // Attach it to a cart line and check out
//! let cart = store.append(&guest_id, item).await?;
//! let session = checkout.open(&guest_id).await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod distance;
pub mod error;
pub mod gateway;
pub mod money;
pub mod session;
pub mod store;
pub mod tier;

// Re-exports for convenience
pub use cart::{Cart, CartItem, Upsell, MAX_CARD_MESSAGE_LEN};
pub use checkout::{
    CheckoutSession, CheckoutStatus, CheckoutStep, ContactPreference, RecipientInfo, SenderInfo,
};
pub use distance::{
    BoxedDistanceClient, DistanceClient, DistanceReport, DistanceResolver, DistanceStatus,
};
pub use error::{ErrorKind, OrderError, OrderResult};
pub use gateway::{
    Authorization, AuthorizationStatus, BoxedPaymentGateway, GatewayEvent, GatewayEventType,
    PaymentGateway, MIN_CHARGE_MINOR_UNITS,
};
pub use money::{Currency, Price};
pub use session::{CheckoutService, SessionStore};
pub use store::{BoxedCartRepository, CartRepository, CartStore, MemoryCartRepository};
pub use tier::{DeliveryCostTier, DeliveryPricer, TierTable, TierTableConfig};
