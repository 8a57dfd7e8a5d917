//! # Application State
//!
//! Shared state for the axum application: cart store, checkout service,
//! distance resolver, delivery pricer, and webhook verifier, wired from
//! environment configuration and the tier table file.

use petal_core::{
    BoxedDistanceClient, BoxedPaymentGateway, CartStore, CheckoutService, Currency,
    DeliveryCostTier, DeliveryPricer, DistanceResolver, TierTable, TierTableConfig,
};
use petal_distance::DistanceMatrixClient;
use petal_stripe::{StripeConfig, StripeIntentGateway, StripeWebhookVerifier};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Checkout orchestration (owns the cart store)
    pub checkout: Arc<CheckoutService>,
    /// Address-to-distance resolution
    pub resolver: Arc<DistanceResolver>,
    /// Distance-to-fee pricing
    pub pricer: Arc<DeliveryPricer>,
    /// Webhook signature verification, when Stripe is configured
    pub webhooks: Option<Arc<StripeWebhookVerifier>>,
}

impl AppState {
    /// Wire everything from environment configuration
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let currency = shop_currency();
        let table = load_tier_table(currency)?;
        let pricer = Arc::new(DeliveryPricer::new(table));

        let store = Arc::new(CartStore::in_memory(currency));

        let distance_client = DistanceMatrixClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Distance Matrix: {e}"))?;
        let origin = distance_client.origin().to_string();
        let region = distance_client.region().to_string();
        let resolver = Arc::new(DistanceResolver::new(
            Arc::new(distance_client) as BoxedDistanceClient,
            origin,
            region,
        ));

        let stripe_config = StripeConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {e}"))?;
        let webhooks = Some(Arc::new(StripeWebhookVerifier::new(&stripe_config)));
        let gateway =
            Arc::new(StripeIntentGateway::new(stripe_config)) as BoxedPaymentGateway;

        let checkout = Arc::new(CheckoutService::new(store, gateway));

        Ok(Self {
            config,
            checkout,
            resolver,
            pricer,
            webhooks,
        })
    }

    /// Assemble state from explicit collaborators (tests swap in stubs)
    pub fn with_components(
        config: AppConfig,
        checkout: Arc<CheckoutService>,
        resolver: Arc<DistanceResolver>,
        pricer: Arc<DeliveryPricer>,
        webhooks: Option<Arc<StripeWebhookVerifier>>,
    ) -> Self {
        Self {
            config,
            checkout,
            resolver,
            pricer,
            webhooks,
        }
    }

    /// The cart store behind the checkout service
    pub fn cart_store(&self) -> &Arc<CartStore> {
        self.checkout.cart_store()
    }
}

fn shop_currency() -> Currency {
    std::env::var("SHOP_CURRENCY")
        .ok()
        .and_then(|c| Currency::parse(&c))
        .unwrap_or_default()
}

/// Load the tier table from `config/tiers.toml`.
///
/// The file sorts tiers ascending by `max_distance`; the table validates
/// that contract. When no file is found the built-in default bands are
/// used.
fn load_tier_table(currency: Currency) -> anyhow::Result<TierTable> {
    let config_paths = [
        "config/tiers.toml",
        "../config/tiers.toml",
        "../../config/tiers.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let config: TierTableConfig = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {path}: {e}"))?;
            let table = config
                .into_table()
                .map_err(|e| anyhow::anyhow!("Invalid tier table in {path}: {e}"))?;
            tracing::info!("Loaded {} delivery tiers from {}", table.tiers().len(), path);
            return Ok(table);
        }
    }

    tracing::warn!("No tier config found, using built-in default tiers");
    default_tier_table(currency)
}

/// Default delivery bands matching the shop's standard rates
fn default_tier_table(currency: Currency) -> anyhow::Result<TierTable> {
    TierTable::new(vec![
        DeliveryCostTier::new(0.0, 5.0, 5.0, currency),
        DeliveryCostTier::new(5.0, 10.0, 8.0, currency),
        DeliveryCostTier::new(10.0, 20.0, 12.0, currency),
    ])
    .map_err(|e| anyhow::anyhow!("Invalid default tier table: {e}"))
}
