//! # Payment Processor Trait
//!
//! The outbound side of the server: the handful of processor API calls the
//! HTTP layer forwards to. The Stripe implementation lives in `pay-stripe`;
//! tests substitute an in-memory fake.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProcessor (trait)                   │
//! │  ├── create_payment_intent()                                │
//! │  ├── retrieve_payment_intent()                              │
//! │  ├── create_customer()                                      │
//! │  ├── calculate_tax()                                        │
//! │  └── publishable_key()                                      │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │  StripeProcessor  │
//!                  └───────────────────┘
//! ```

use crate::error::PaymentResult;
use crate::intent::{
    Customer, PaymentIntent, PaymentIntentParams, PaymentMethodType, TaxCalculation,
    TaxCalculationParams, DEFAULT_ORDER_AMOUNT,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Core trait for payment processor API clients.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a payment intent.
    async fn create_payment_intent(&self, params: &PaymentIntentParams)
        -> PaymentResult<PaymentIntent>;

    /// Retrieve a payment intent, expanding the listed fields.
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
        expand: &[&str],
    ) -> PaymentResult<PaymentIntent>;

    /// Create an empty customer.
    async fn create_customer(&self) -> PaymentResult<Customer>;

    /// Quote tax for a single line item.
    async fn calculate_tax(&self, params: &TaxCalculationParams) -> PaymentResult<TaxCalculation>;

    /// Key the browser uses to initialise the payment form.
    fn publishable_key(&self) -> &str;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared processor (dynamic dispatch)
pub type BoxedPaymentProcessor = Arc<dyn PaymentProcessor>;

/// Pricing knobs for payment intent creation
#[derive(Debug, Clone)]
pub struct IntentSettings {
    /// Amount before tax (smallest currency unit)
    pub order_amount: i64,
    /// Ask the processor for a tax quote before creating the intent
    pub calculate_tax: bool,
}

impl Default for IntentSettings {
    fn default() -> Self {
        Self {
            order_amount: DEFAULT_ORDER_AMOUNT,
            calculate_tax: false,
        }
    }
}

/// Assemble payment intent parameters, calling out to the processor for
/// the tax quote and the customer when the method needs them.
///
/// Caller-supplied `payment_method_options` win over per-method defaults.
pub async fn prepare_payment_intent(
    processor: &dyn PaymentProcessor,
    settings: &IntentSettings,
    method: &PaymentMethodType,
    currency: &str,
    payment_method_options: Option<Value>,
    customer_id: Option<String>,
) -> PaymentResult<PaymentIntentParams> {
    let mut params = PaymentIntentParams::new(method, settings.order_amount, currency);

    if settings.calculate_tax {
        let tax = processor
            .calculate_tax(&TaxCalculationParams::new(settings.order_amount, currency))
            .await?;
        params = params.with_tax_calculation(&tax);
    }

    if method.requires_customer() {
        let customer = match customer_id {
            Some(id) => id,
            None => processor.create_customer().await?.id,
        };
        params = params.with_customer(customer);
    }

    if let Some(options) = payment_method_options {
        params = params.with_payment_method_options(options);
    }

    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProcessor {
        customers_created: AtomicUsize,
        tax_quotes: AtomicUsize,
    }

    #[async_trait]
    impl PaymentProcessor for FakeProcessor {
        async fn create_payment_intent(
            &self,
            _params: &PaymentIntentParams,
        ) -> PaymentResult<PaymentIntent> {
            Err(PaymentError::Internal("not used".into()))
        }

        async fn retrieve_payment_intent(
            &self,
            _payment_intent_id: &str,
            _expand: &[&str],
        ) -> PaymentResult<PaymentIntent> {
            Err(PaymentError::Internal("not used".into()))
        }

        async fn create_customer(&self) -> PaymentResult<Customer> {
            self.customers_created.fetch_add(1, Ordering::SeqCst);
            Ok(Customer {
                id: "cus_new".to_string(),
            })
        }

        async fn calculate_tax(
            &self,
            params: &TaxCalculationParams,
        ) -> PaymentResult<TaxCalculation> {
            self.tax_quotes.fetch_add(1, Ordering::SeqCst);
            Ok(TaxCalculation {
                id: "taxcalc_1".to_string(),
                amount_total: params.amount + 480,
            })
        }

        fn publishable_key(&self) -> &str {
            "pk_test_fake"
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    #[tokio::test]
    async fn test_card_needs_no_collaborators() {
        let processor = FakeProcessor::default();
        let params = prepare_payment_intent(
            &processor,
            &IntentSettings::default(),
            &"card".into(),
            "usd",
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(params.amount, 5999);
        assert_eq!(processor.customers_created.load(Ordering::SeqCst), 0);
        assert_eq!(processor.tax_quotes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_customer_balance_creates_customer() {
        let processor = FakeProcessor::default();
        let params = prepare_payment_intent(
            &processor,
            &IntentSettings::default(),
            &PaymentMethodType::CustomerBalance,
            "jpy",
            None,
            None,
        )
        .await
        .unwrap();

        assert_eq!(params.customer.as_deref(), Some("cus_new"));
        assert_eq!(processor.customers_created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_customer_balance_uses_given_customer() {
        let processor = FakeProcessor::default();
        let params = prepare_payment_intent(
            &processor,
            &IntentSettings::default(),
            &PaymentMethodType::CustomerBalance,
            "jpy",
            None,
            Some("cus_existing".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(params.customer.as_deref(), Some("cus_existing"));
        assert_eq!(processor.customers_created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tax_enabled() {
        let processor = FakeProcessor::default();
        let settings = IntentSettings {
            order_amount: 5999,
            calculate_tax: true,
        };
        let params = prepare_payment_intent(&processor, &settings, &"card".into(), "usd", None, None)
            .await
            .unwrap();

        assert_eq!(params.amount, 6479);
        assert_eq!(
            params.metadata.get("tax_calculation").map(String::as_str),
            Some("taxcalc_1")
        );
    }

    #[tokio::test]
    async fn test_options_override() {
        let processor = FakeProcessor::default();
        let options = json!({ "acss_debit": { "verification_method": "instant" } });
        let params = prepare_payment_intent(
            &processor,
            &IntentSettings::default(),
            &PaymentMethodType::AcssDebit,
            "cad",
            Some(options.clone()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(params.payment_method_options, Some(options));
    }
}
