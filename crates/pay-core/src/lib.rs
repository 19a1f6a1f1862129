//! # pay-core
//!
//! Core types and traits for the accept-a-payment server.
//!
//! This crate provides:
//! - `PaymentProcessor` trait for the outbound processor API
//! - `PaymentIntentParams` and `PaymentMethodType` for intent assembly
//! - `WebhookEvent` and `WebhookEventType` for inbound notifications
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{prepare_payment_intent, IntentSettings, PaymentMethodType};
//!
//! let params = prepare_payment_intent(
//!     &processor,
//!     &IntentSettings::default(),
//!     &PaymentMethodType::from_tag("konbini"),
//!     "jpy",
//!     None,
//!     None,
//! ).await?;
//!
//! let intent = processor.create_payment_intent(&params).await?;
//! // Hand intent.client_secret to the browser
//! ```

pub mod error;
pub mod event;
pub mod intent;
pub mod processor;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use event::{WebhookEvent, WebhookEventType};
pub use intent::{
    Customer, PaymentIntent, PaymentIntentParams, PaymentMethodType, TaxCalculation,
    TaxCalculationParams, DEFAULT_ORDER_AMOUNT,
};
pub use processor::{
    prepare_payment_intent, BoxedPaymentProcessor, IntentSettings, PaymentProcessor,
};
