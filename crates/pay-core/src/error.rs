//! # Payment Error Types
//!
//! Typed error handling for the accept-a-payment server.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// A webhook handler could not complete its side effect
    #[error("Webhook handler failed: {0}")]
    WebhookHandlerFailed(String),

    /// Payment intent not found at the provider
    #[error("Payment intent not found: {payment_intent_id}")]
    PaymentIntentNotFound { payment_intent_id: String },

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::NetworkError(_)
                | PaymentError::RateLimited { .. }
                | PaymentError::ProviderError { .. }
                | PaymentError::WebhookHandlerFailed(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidRequest(_) => 400,
            PaymentError::ProviderError { .. } => 502,
            PaymentError::NetworkError(_) => 503,
            // Stripe treats any non-2xx as a failed delivery; 400 marks it as ours to reject.
            PaymentError::WebhookVerificationFailed(_) => 400,
            PaymentError::WebhookParseError(_) => 400,
            PaymentError::WebhookHandlerFailed(_) => 500,
            PaymentError::PaymentIntentNotFound { .. } => 404,
            PaymentError::RateLimited { .. } => 429,
            PaymentError::Internal(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
