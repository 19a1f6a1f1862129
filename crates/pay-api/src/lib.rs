//! # pay-api
//!
//! HTTP API layer for the accept-a-payment server.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Payment intent endpoints forwarding to Stripe
//! - Webhook handler for payment events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/config` | Publishable key |
//! | POST | `/create-payment-intent` | Create payment intent |
//! | GET | `/payment/next` | Redirect after payment |
//! | GET | `/success` | Success landing |
//! | POST | `/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
