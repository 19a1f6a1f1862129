//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Path Stripe delivers webhooks to
pub const WEBHOOK_PATH: &str = "/webhook";

/// Create the main application router
///
/// Routes:
/// - GET  /config - Publishable key
/// - POST /create-payment-intent - Create a payment intent
/// - GET  /payment/next - Retrieve intent, redirect to success
/// - GET  /success - Success landing
/// - POST /webhook - Stripe webhook handler (raw body)
/// - GET  /health - Health check
pub fn create_router(state: AppState) -> Router {
    // The demo frontend may be served from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/payment/next", get(handlers::payment_next))
        .route("/success", get(handlers::success));

    // Webhook route takes the raw body; signatures are computed over the exact bytes
    let webhook_routes = Router::new().route(WEBHOOK_PATH, post(handlers::stripe_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .merge(api_routes)
        .merge(webhook_routes)
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        // State
        .with_state(state)
}
