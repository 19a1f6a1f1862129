//! # accept-a-payment
//!
//! Payment intent demo server backed by Stripe.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...   # optional
//!
//! # Run the server
//! accept-a-payment
//! ```

use pay_api::{routes, state::AppState};
use pay_stripe::HANDLED_WEBHOOK_EVENTS;
use tokio::signal;
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

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.processor.provider_name());
    info!(
        "Webhook verification: {}",
        if state.receiver.is_verifying() { "on" } else { "off" }
    );

    // Create router
    let app = routes::create_router(state);

    info!("🚀 accept-a-payment listening on http://{}", addr);

    if !is_prod {
        info!("💳 Payment intent: POST http://{}/create-payment-intent", addr);
        info!(
            "🔔 Webhook: POST http://{}{} (events: {})",
            addr,
            routes::WEBHOOK_PATH,
            HANDLED_WEBHOOK_EVENTS.join(", ")
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}
