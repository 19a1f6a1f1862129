//! # pay-stripe
//!
//! Stripe integration for the accept-a-payment server.
//!
//! This crate provides:
//!
//! 1. **StripeProcessor** - REST client implementing `PaymentProcessor`
//!    - Payment intents (create, retrieve with expansion)
//!    - Customers (for customer balance transfers)
//!    - Tax calculations
//!
//! 2. **WebhookReceiver** - inbound webhook authentication and dispatch
//!    - `Stripe-Signature` verification over the raw body
//!    - Unverified fallback when no signing secret is configured
//!    - `WebhookHandler` seam for fulfillment side effects
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_stripe::StripeProcessor;
//! use pay_core::{PaymentIntentParams, PaymentProcessor};
//!
//! let processor = StripeProcessor::from_env()?;
//! let params = PaymentIntentParams::new(&"card".into(), 5999, "usd");
//! let intent = processor.create_payment_intent(&params).await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use pay_stripe::{WebhookHandler, WebhookReceiver};
//!
//! struct Fulfillment;
//!
//! impl WebhookHandler for Fulfillment {
//!     fn on_payment_succeeded(&self, event: &WebhookEvent) -> PaymentResult<()> {
//!         ship(event.payment_intent_id())?;
//!         Ok(())
//!     }
//! }
//!
//! let receiver = WebhookReceiver::new(config.webhook_secret.clone(), Arc::new(Fulfillment));
//! // In your webhook endpoint:
//! receiver.receive(&raw_body, signature_header)?;
//! ```

pub mod client;
pub mod config;
pub mod receiver;
pub mod webhook;

// Re-exports
pub use client::StripeProcessor;
pub use config::{AppInfo, StripeConfig, STRIPE_API_VERSION};
pub use receiver::WebhookReceiver;
pub use webhook::{
    construct_event, dispatch_webhook_event, signature_header, verify_signature,
    LoggingWebhookHandler, WebhookHandler, DEFAULT_TOLERANCE_SECS, HANDLED_WEBHOOK_EVENTS,
    SIGNATURE_HEADER,
};
