//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Each handler forwards to the payment processor or the webhook receiver.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use pay_core::{prepare_payment_intent, PaymentError, PaymentMethodType};
use pay_stripe::SIGNATURE_HEADER;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Publishable key response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub publishable_key: String,
}

/// Create payment intent request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    /// Payment method type (`card`, `link`, `konbini`, ...)
    #[serde(default)]
    pub payment_method_type: String,
    /// Lowercase ISO currency code
    #[serde(default)]
    pub currency: String,
    /// Replaces the default payment method options when present
    #[serde(default)]
    pub payment_method_options: Option<serde_json::Value>,
    /// Existing customer for customer balance payments
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Create payment intent response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: Option<String>,
    pub next_action: Option<serde_json::Value>,
}

/// Query for the post-payment redirect
#[derive(Debug, Deserialize)]
pub struct PaymentNextQuery {
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// Error response: `{ "error": { "message": ... } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
            },
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Message shown to the client; provider errors pass Stripe's text through
fn client_message(err: &PaymentError) -> String {
    match err {
        PaymentError::ProviderError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let code = err.status_code();
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(ErrorResponse::new(client_message(&err))),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "accept-a-payment",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Publishable key for the browser
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        publishable_key: state.processor.publishable_key().to_string(),
    })
}

/// Create a payment intent for the demo order.
///
/// Every failure answers 400 with the processor's message.
#[instrument(skip(state, request), fields(method = %request.payment_method_type, currency = %request.currency))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentIntentRequest>,
) -> Result<Json<CreatePaymentIntentResponse>, ApiError> {
    if request.payment_method_type.is_empty() {
        return Err(bad_request("paymentMethodType is required"));
    }
    if request.currency.is_empty() {
        return Err(bad_request("currency is required"));
    }

    let method = PaymentMethodType::from_tag(&request.payment_method_type);
    let settings = state.config.intent_settings();

    let params = prepare_payment_intent(
        state.processor.as_ref(),
        &settings,
        &method,
        &request.currency,
        request.payment_method_options,
        request.customer_id,
    )
    .await
    .map_err(|e| {
        error!("Failed to prepare payment intent: {}", e);
        bad_request(client_message(&e))
    })?;

    let intent = state
        .processor
        .create_payment_intent(&params)
        .await
        .map_err(|e| {
            error!("Failed to create payment intent: {}", e);
            bad_request(client_message(&e))
        })?;

    info!("Created payment intent: {}", intent.id);

    Ok(Json(CreatePaymentIntentResponse {
        client_secret: intent.client_secret,
        next_action: intent.next_action,
    }))
}

/// Retrieve the payment intent and send the customer to the success page
#[instrument(skip(state))]
pub async fn payment_next(
    State(state): State<AppState>,
    Query(query): Query<PaymentNextQuery>,
) -> Result<Redirect, ApiError> {
    let payment_intent_id = query
        .payment_intent
        .filter(|id| !id.is_empty())
        .ok_or_else(|| bad_request("payment_intent query parameter is required"))?;

    let intent = state
        .processor
        .retrieve_payment_intent(&payment_intent_id, &["payment_method"])
        .await
        .map_err(|e| {
            error!("Failed to retrieve payment intent: {}", e);
            payment_error_to_response(e)
        })?;

    let client_secret = intent.client_secret.unwrap_or_default();

    Ok(Redirect::to(&format!(
        "/success?payment_intent_client_secret={}",
        client_secret
    )))
}

/// Landing page after payment
pub async fn success() -> Json<&'static str> {
    Json("SUCCESS!")
}

/// Handle Stripe webhook
///
/// Only verification and parse failures answer non-2xx; Stripe retries those.
#[instrument(skip(state, headers, body), fields(bytes = body.len()))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state
        .receiver
        .receive(&body, signature)
        .map_err(payment_error_to_response)?;

    Ok(StatusCode::OK)
}
