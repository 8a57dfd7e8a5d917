//! # petal-distance
//!
//! Google Distance Matrix integration for petal-cart-rs.
//!
//! Provides [`DistanceMatrixClient`], the production implementation of
//! `petal_core::DistanceClient`: one shop origin, one destination per
//! query, distance in meters out.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use petal_core::DistanceResolver;
//! use petal_distance::DistanceMatrixClient;
//! use std::sync::Arc;
//!
//! let client = DistanceMatrixClient::from_env()?;
//! let resolver = DistanceResolver::new(
//!     Arc::new(client),
//!     "4190 15th Ave, Prince George, BC, V2M1V8",
//!     "BC",
//! );
//!
//! let km = resolver.resolve("V2M1V8").await?;
//! ```

pub mod config;
pub mod matrix;

// Re-exports
pub use config::{DistanceConfig, DEFAULT_ORIGIN, DEFAULT_REGION};
pub use matrix::DistanceMatrixClient;
