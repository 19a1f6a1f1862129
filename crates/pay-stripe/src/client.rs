//! # Stripe REST Client
//!
//! Implementation of `PaymentProcessor` over the Stripe REST API:
//! payment intents, customers and tax calculations.

use crate::config::StripeConfig;
use async_trait::async_trait;
use pay_core::{
    Customer, PaymentError, PaymentIntent, PaymentIntentParams, PaymentProcessor, PaymentResult,
    TaxCalculation, TaxCalculationParams,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Stripe payment processor
pub struct StripeProcessor {
    config: StripeConfig,
    client: Client,
}

impl StripeProcessor {
    /// Create a new Stripe processor
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    /// POST a form with a fresh idempotency key
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> PaymentResult<T> {
        let idempotency_key = Uuid::new_v4().to_string();

        let response = self
            .authorized(self.client.post(self.url(path)))
            .header("Idempotency-Key", &idempotency_key)
            .form(form)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        read_response(response).await
    }
}

#[async_trait]
impl PaymentProcessor for StripeProcessor {
    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> PaymentResult<PaymentIntent> {
        debug!(
            "Creating Stripe payment intent: methods={:?}, confirm={}",
            params.payment_method_types, params.confirm
        );

        let intent: PaymentIntent = self
            .post_form("/v1/payment_intents", &params.to_form())
            .await?;

        info!(
            "Created Stripe payment intent: id={}, status={:?}",
            intent.id, intent.status
        );

        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
        expand: &[&str],
    ) -> PaymentResult<PaymentIntent> {
        let query: Vec<(&str, &str)> = expand.iter().map(|field| ("expand[]", *field)).collect();

        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/v1/payment_intents/{}", payment_intent_id))),
            )
            .query(&query)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(PaymentError::PaymentIntentNotFound {
                payment_intent_id: payment_intent_id.to_string(),
            });
        }

        read_response(response).await
    }

    #[instrument(skip(self))]
    async fn create_customer(&self) -> PaymentResult<Customer> {
        let customer: Customer = self.post_form("/v1/customers", &[]).await?;
        info!("Created Stripe customer: id={}", customer.id);
        Ok(customer)
    }

    #[instrument(skip(self, params), fields(amount = params.amount, currency = %params.currency))]
    async fn calculate_tax(&self, params: &TaxCalculationParams) -> PaymentResult<TaxCalculation> {
        let calculation: TaxCalculation = self
            .post_form("/v1/tax/calculations", &params.to_form())
            .await?;

        debug!(
            "Stripe tax calculation: id={}, amount_total={}",
            calculation.id, calculation.amount_total
        );

        Ok(calculation)
    }

    fn publishable_key(&self) -> &str {
        &self.config.publishable_key
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

/// Turn a Stripe response into `T` or a typed error
async fn read_response<T: DeserializeOwned>(response: Response) -> PaymentResult<T> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());

    let body = response
        .text()
        .await
        .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

    if !status.is_success() {
        error!("Stripe API error: status={}, body={}", status, body);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PaymentError::RateLimited {
                provider: "stripe".to_string(),
                retry_after_secs: retry_after.unwrap_or(1),
            });
        }

        // Parse Stripe error
        if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
            return Err(PaymentError::ProviderError {
                provider: "stripe".to_string(),
                message: error_response.error.message,
            });
        }

        return Err(PaymentError::ProviderError {
            provider: "stripe".to_string(),
            message: format!("HTTP {}: {}", status, body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
    })
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
