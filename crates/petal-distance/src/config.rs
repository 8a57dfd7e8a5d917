//! # Distance Matrix Configuration
//!
//! Configuration for the Google Distance Matrix integration.
//! The API key is loaded from environment variables.

use petal_core::OrderError;
use std::env;

/// Default shop origin when none is configured
pub const DEFAULT_ORIGIN: &str = "4190 15th Ave, Prince George, BC, V2M1V8";

/// Default region qualifier appended to normalized destinations
pub const DEFAULT_REGION: &str = "BC";

/// Google Distance Matrix API configuration
#[derive(Debug, Clone)]
pub struct DistanceConfig {
    /// API key
    pub api_key: String,

    /// Shop address used as the single origin of every query
    pub origin: String,

    /// Region qualifier appended to destinations (e.g. "BC")
    pub region: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,
}

impl DistanceConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `GOOGLE_MAPS_API_KEY`
    ///
    /// Optional:
    /// - `SHOP_ORIGIN_ADDRESS` (defaults to the shop's street address)
    /// - `SHOP_REGION` (defaults to "BC")
    pub fn from_env() -> Result<Self, OrderError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_key = env::var("GOOGLE_MAPS_API_KEY").map_err(|_| {
            OrderError::Configuration("GOOGLE_MAPS_API_KEY not set".to_string())
        })?;

        if api_key.trim().is_empty() {
            return Err(OrderError::Configuration(
                "GOOGLE_MAPS_API_KEY must not be empty".to_string(),
            ));
        }

        let origin =
            env::var("SHOP_ORIGIN_ADDRESS").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let region = env::var("SHOP_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());

        Ok(Self {
            api_key,
            origin,
            region,
            api_base_url: "https://maps.googleapis.com".to_string(),
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            origin: DEFAULT_ORIGIN.to_string(),
            region: DEFAULT_REGION.to_string(),
            api_base_url: "https://maps.googleapis.com".to_string(),
        }
    }

    /// Builder: set the shop origin address
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Builder: set the region qualifier
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config() {
        let config = DistanceConfig::new("test-key")
            .with_origin("123 Main St")
            .with_region("AB")
            .with_api_base_url("http://localhost:9999");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.origin, "123 Main St");
        assert_eq!(config.region, "AB");
        assert_eq!(config.api_base_url, "http://localhost:9999");
    }

    #[test]
    fn test_defaults() {
        let config = DistanceConfig::new("test-key");
        assert_eq!(config.origin, DEFAULT_ORIGIN);
        assert_eq!(config.region, DEFAULT_REGION);
    }
}
