//! # Payment Intent Types
//!
//! Parameter assembly for payment intents, plus the provider responses the
//! server reads back. Parameters serialise to the bracketed form encoding
//! used by Stripe-style REST APIs (`payment_method_options[konbini][expires_after_days]=3`).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Order amount charged when nothing else is configured (smallest currency unit)
pub const DEFAULT_ORDER_AMOUNT: i64 = 5999;

/// Payment method types that change how the intent is built
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentMethodType {
    /// Link; always offered alongside `card`
    Link,
    /// Canadian pre-authorized debit, needs mandate options
    AcssDebit,
    /// Japanese convenience store payments
    Konbini,
    /// Bank transfer into a customer balance, needs a customer
    CustomerBalance,
    /// Any other type (`card`, `ideal`, ...), passed through unchanged
    Other(String),
}

impl PaymentMethodType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "link" => PaymentMethodType::Link,
            "acss_debit" => PaymentMethodType::AcssDebit,
            "konbini" => PaymentMethodType::Konbini,
            "customer_balance" => PaymentMethodType::CustomerBalance,
            other => PaymentMethodType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethodType::Link => "link",
            PaymentMethodType::AcssDebit => "acss_debit",
            PaymentMethodType::Konbini => "konbini",
            PaymentMethodType::CustomerBalance => "customer_balance",
            PaymentMethodType::Other(tag) => tag,
        }
    }

    /// The `payment_method_types` list sent to the provider
    pub fn payment_method_types(&self) -> Vec<String> {
        match self {
            PaymentMethodType::Link => vec!["link".to_string(), "card".to_string()],
            other => vec![other.as_str().to_string()],
        }
    }

    /// Default `payment_method_options` for this type, if any
    pub fn default_options(&self) -> Option<Value> {
        match self {
            PaymentMethodType::AcssDebit => Some(json!({
                "acss_debit": {
                    "mandate_options": {
                        "payment_schedule": "sporadic",
                        "transaction_type": "personal",
                    }
                }
            })),
            PaymentMethodType::Konbini => Some(json!({
                "konbini": {
                    "product_description": "Tシャツ",
                    "expires_after_days": 3,
                }
            })),
            _ => None,
        }
    }

    /// Whether the intent must be attached to a customer and confirmed up front
    pub fn requires_customer(&self) -> bool {
        matches!(self, PaymentMethodType::CustomerBalance)
    }
}

impl From<&str> for PaymentMethodType {
    fn from(tag: &str) -> Self {
        Self::from_tag(tag)
    }
}

impl std::fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for creating a payment intent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentParams {
    /// Amount in smallest currency unit
    pub amount: i64,
    /// Lowercase ISO currency code
    pub currency: String,
    pub payment_method_types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_data: Option<Value>,
    /// Confirm on creation (customer balance transfers)
    pub confirm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl PaymentIntentParams {
    /// Build the parameters for a payment method type with its defaults applied.
    ///
    /// For customer balance the customer is still unset; attach one with
    /// [`PaymentIntentParams::with_customer`].
    pub fn new(method: &PaymentMethodType, amount: i64, currency: impl Into<String>) -> Self {
        let mut params = Self {
            amount,
            currency: currency.into(),
            payment_method_types: method.payment_method_types(),
            payment_method_options: method.default_options(),
            payment_method_data: None,
            confirm: false,
            customer: None,
            metadata: BTreeMap::new(),
        };

        if method.requires_customer() {
            params.payment_method_data = Some(json!({ "type": method.as_str() }));
            params.confirm = true;
        }

        params
    }

    /// Charge the tax-inclusive total and keep a reference to the calculation
    pub fn with_tax_calculation(mut self, tax: &TaxCalculation) -> Self {
        self.amount = tax.amount_total;
        self.metadata
            .insert("tax_calculation".to_string(), tax.id.clone());
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer = Some(customer_id.into());
        self
    }

    /// Replace the payment method options wholesale
    pub fn with_payment_method_options(mut self, options: Value) -> Self {
        self.payment_method_options = Some(options);
        self
    }

    /// Form-encode for the provider API
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
        ];

        for (i, method) in self.payment_method_types.iter().enumerate() {
            form.push((format!("payment_method_types[{}]", i), method.clone()));
        }

        if self.confirm {
            form.push(("confirm".to_string(), "true".to_string()));
        }

        if let Some(ref customer) = self.customer {
            form.push(("customer".to_string(), customer.clone()));
        }

        for (key, value) in &self.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        if let Some(ref options) = self.payment_method_options {
            flatten_form("payment_method_options", options, &mut form);
        }

        if let Some(ref data) = self.payment_method_data {
            flatten_form("payment_method_data", data, &mut form);
        }

        form
    }
}

/// Request for a tax quote on the single demo line item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxCalculationParams {
    pub amount: i64,
    pub currency: String,
}

impl TaxCalculationParams {
    pub const REFERENCE: &'static str = "ProductRef";
    pub const TAX_CODE: &'static str = "txcd_30011000";

    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("currency".to_string(), self.currency.clone())];

        let body = json!({
            "customer_details": {
                "address": {
                    "line1": "10709 Cleary Blvd",
                    "city": "Plantation",
                    "state": "FL",
                    "postal_code": "33322",
                    "country": "US",
                },
                "address_source": "shipping",
            },
            "line_items": [{
                "amount": self.amount,
                "reference": Self::REFERENCE,
                "tax_behavior": "exclusive",
                "tax_code": Self::TAX_CODE,
            }],
        });

        if let Value::Object(map) = body {
            for (key, value) in &map {
                flatten_form(key, value, &mut form);
            }
        }

        form
    }
}

/// A payment intent as returned by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub next_action: Option<Value>,
    /// ID string, or the full object when expanded
    #[serde(default)]
    pub payment_method: Option<Value>,
}

/// Result of a tax calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub id: String,
    pub amount_total: i64,
}

/// A customer created at the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// Flatten a JSON value into bracketed form fields under `prefix`
pub fn flatten_form(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_form(&format!("{}[{}]", prefix, key), nested, out);
            }
        }
        Value::Array(items) => {
            for (i, nested) in items.iter().enumerate() {
                flatten_form(&format!("{}[{}]", prefix, i), nested, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
        Value::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        // Empty string unsets a field
        Value::Null => out.push((prefix.to_string(), String::new())),
    }
}
