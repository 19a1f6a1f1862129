//! # Webhook Receiver
//!
//! Authenticates an inbound webhook delivery and dispatches it.
//!
//! With a signing secret configured, only deliveries whose `Stripe-Signature`
//! verifies over the raw body are dispatched. Without one, the body is
//! trusted as-is; this is the lower-trust mode for local development. An
//! unsigned body that is not an event envelope is acknowledged without
//! dispatch, so only verification failures are ever rejected there.

use crate::webhook::{construct_event, dispatch_webhook_event, WebhookHandler, DEFAULT_TOLERANCE_SECS};
use chrono::Utc;
use pay_core::{PaymentError, PaymentResult, WebhookEvent, WebhookEventType};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Verifies and dispatches webhook deliveries. Holds no per-request state.
#[derive(Clone)]
pub struct WebhookReceiver {
    secret: Option<String>,
    tolerance_secs: i64,
    handler: Arc<dyn WebhookHandler>,
}

impl WebhookReceiver {
    /// `secret` of `None` selects the unverified mode
    pub fn new(secret: Option<String>, handler: Arc<dyn WebhookHandler>) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            handler,
        }
    }

    /// Builder: override the timestamp tolerance (0 disables the check)
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Whether deliveries must carry a valid signature
    pub fn is_verifying(&self) -> bool {
        self.secret.is_some()
    }

    /// Turn a delivery into an event, verifying it when a secret is set.
    pub fn authenticate(&self, payload: &[u8], signature: Option<&str>) -> PaymentResult<WebhookEvent> {
        match self.secret {
            Some(ref secret) => {
                let signature = signature.ok_or_else(|| {
                    PaymentError::WebhookVerificationFailed(
                        "Missing Stripe-Signature header".to_string(),
                    )
                })?;
                construct_event(
                    payload,
                    signature,
                    secret,
                    self.tolerance_secs,
                    Utc::now().timestamp(),
                )
            }
            None => match WebhookEvent::from_slice(payload, false) {
                Ok(event) => Ok(event),
                Err(e) => {
                    debug!("Unsigned webhook body is not an event: {}", e);
                    Ok(untyped_event())
                }
            },
        }
    }

    /// Authenticate, then dispatch to the handler.
    ///
    /// Returns the event on success. Verification failures never reach the
    /// handler.
    pub fn receive(&self, payload: &[u8], signature: Option<&str>) -> PaymentResult<WebhookEvent> {
        let event = self.authenticate(payload, signature).map_err(|e| {
            match &e {
                PaymentError::WebhookVerificationFailed(_) => {
                    warn!("⚠️  Webhook signature verification failed: {}", e)
                }
                _ => warn!("Webhook payload rejected: {}", e),
            }
            e
        })?;

        info!(
            "Received webhook: type={}, id={:?}, verified={}",
            event.event_type, event.event_id, event.verified
        );

        dispatch_webhook_event(self.handler.as_ref(), &event)?;
        Ok(event)
    }
}

/// Stand-in for an unsigned body with no readable envelope
fn untyped_event() -> WebhookEvent {
    WebhookEvent {
        event_id: None,
        event_type: WebhookEventType::Unknown(String::new()),
        data: serde_json::Value::Null,
        created: None,
        verified: false,
    }
}
