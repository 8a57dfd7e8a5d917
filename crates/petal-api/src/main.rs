//! # Petal-Cart RS
//!
//! Order-pricing and cart engine for the flower storefront.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export GOOGLE_MAPS_API_KEY=...
//!
//! # Run the server
//! petal-cart
//! ```

use petal_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!(
        "Delivery tiers loaded: {} (max {} km)",
        state.pricer.table().tiers().len(),
        state.pricer.table().max_distance()
    );

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🌸 Petal-Cart starting on http://{}", addr);

    if !is_prod {
        info!("🚚 Quote:    GET  http://{}/api/v1/delivery/quote", addr);
        info!("🛒 Cart:     POST http://{}/api/v1/cart/{{guest_id}}/items", addr);
        info!("💳 Checkout: POST http://{}/api/v1/checkout", addr);
        info!("🔔 Webhook:  POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  🌸 Petal-Cart RS 🌸
  ━━━━━━━━━━━━━━━━━━━
  Flower order engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
