//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables.

use pay_core::PaymentError;
use std::env;

/// API version pinned for every request
pub const STRIPE_API_VERSION: &str = "2024-06-20";

/// Identifies this integration to Stripe in the `User-Agent`
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
    pub url: Option<String>,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "accept-a-payment".to_string(),
            version: "0.0.2".to_string(),
            url: None,
        }
    }
}

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// Publishable key (pk_test_... or pk_live_...)
    pub publishable_key: String,

    /// Webhook signing secret (whsec_...). Unset means webhooks are not verified.
    pub webhook_secret: Option<String>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    pub app_info: AppInfo,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    /// - `STRIPE_PUBLISHABLE_KEY`
    ///
    /// Optional:
    /// - `STRIPE_WEBHOOK_SECRET`
    /// - `DOMAIN` (reported in the app info URL)
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let secret_key = env::var("STRIPE_SECRET_KEY").map_err(|_| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        let publishable_key = env::var("STRIPE_PUBLISHABLE_KEY").map_err(|_| {
            PaymentError::Configuration("STRIPE_PUBLISHABLE_KEY not set".to_string())
        })?;

        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let mut config = Self::new(secret_key, publishable_key);
        config.webhook_secret = webhook_secret;

        if let Ok(domain) = env::var("DOMAIN") {
            config = config.with_app_url(format!("{}/plugins/stripe/webhook", domain));
        }

        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            webhook_secret: None,
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: STRIPE_API_VERSION.to_string(),
            app_info: AppInfo::default(),
        }
    }

    /// Check key prefixes
    pub fn validate(&self) -> Result<(), PaymentError> {
        if !self.secret_key.starts_with("sk_test_") && !self.secret_key.starts_with("sk_live_") {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        if !self.publishable_key.starts_with("pk_test_")
            && !self.publishable_key.starts_with("pk_live_")
        {
            return Err(PaymentError::Configuration(
                "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
            ));
        }

        if let Some(ref secret) = self.webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(PaymentError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// `User-Agent` carrying the app info
    pub fn user_agent(&self) -> String {
        match self.app_info.url {
            Some(ref url) => format!(
                "{}/{} ({})",
                self.app_info.name, self.app_info.version, url
            ),
            None => format!("{}/{}", self.app_info.name, self.app_info.version),
        }
    }

    /// Builder: set the webhook signing secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the app info URL
    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_info.url = Some(url.into());
        self
    }
}
