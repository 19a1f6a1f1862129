//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment processor, the webhook receiver and configuration.

use pay_core::{BoxedPaymentProcessor, IntentSettings, DEFAULT_ORDER_AMOUNT};
use pay_stripe::{LoggingWebhookHandler, StripeConfig, StripeProcessor, WebhookReceiver};
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
    /// Quote tax before creating payment intents
    pub calculate_tax: bool,
    /// Pre-tax order amount in the smallest currency unit
    pub order_amount: i64,
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
                .unwrap_or(4242),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            calculate_tax: std::env::var("CALCULATE_TAX")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            order_amount: std::env::var("ORDER_AMOUNT")
                .ok()
                .and_then(|a| a.parse().ok())
                .unwrap_or(DEFAULT_ORDER_AMOUNT),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Pricing knobs for payment intent creation
    pub fn intent_settings(&self) -> IntentSettings {
        IntentSettings {
            order_amount: self.order_amount,
            calculate_tax: self.calculate_tax,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4242,
            environment: "development".to_string(),
            calculate_tax: false,
            order_amount: DEFAULT_ORDER_AMOUNT,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Outbound payment processor
    pub processor: BoxedPaymentProcessor,
    /// Inbound webhook verification and dispatch
    pub receiver: Arc<WebhookReceiver>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by Stripe, configured from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let processor = StripeProcessor::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        tracing::info!(
            "Stripe keys: {}",
            if processor.config().is_test_mode() { "test" } else { "live" }
        );
        if let Some(warning) = unverified_webhook_warning(processor.config()) {
            tracing::warn!("{}", warning);
        }

        let secret = processor.config().webhook_secret.clone();
        let receiver = WebhookReceiver::new(secret, Arc::new(LoggingWebhookHandler));

        Ok(Self::from_parts(config, Arc::new(processor), receiver))
    }

    /// Assemble state from ready-made parts
    pub fn from_parts(
        config: AppConfig,
        processor: BoxedPaymentProcessor,
        receiver: WebhookReceiver,
    ) -> Self {
        Self {
            processor,
            receiver: Arc::new(receiver),
            config,
        }
    }
}

/// Startup warning for a receiver that will trust unsigned payloads
fn unverified_webhook_warning(stripe: &StripeConfig) -> Option<&'static str> {
    if stripe.webhook_secret.is_some() {
        None
    } else if stripe.is_live_mode() {
        Some("Live Stripe keys without STRIPE_WEBHOOK_SECRET: unsigned webhook payloads will be trusted")
    } else {
        Some("STRIPE_WEBHOOK_SECRET not set, webhook payloads will not be verified")
    }
}
