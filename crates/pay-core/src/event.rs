//! # Webhook Event Types
//!
//! The event envelope delivered by the payment processor, and the closed
//! set of event types this server acts on.

use crate::error::{PaymentError, PaymentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook event types we act on
///
/// Anything else lands in `Unknown` and is acknowledged without action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    /// `payment_intent.succeeded`: funds have been captured
    PaymentSucceeded,
    /// `payment_intent.payment_failed`
    PaymentFailed,
    /// Unknown event (passthrough)
    Unknown(String),
}

impl WebhookEventType {
    pub const PAYMENT_SUCCEEDED: &'static str = "payment_intent.succeeded";
    pub const PAYMENT_FAILED: &'static str = "payment_intent.payment_failed";

    /// Map a provider event tag onto the enum
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            Self::PAYMENT_SUCCEEDED => WebhookEventType::PaymentSucceeded,
            Self::PAYMENT_FAILED => WebhookEventType::PaymentFailed,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }

    /// The provider's tag for this event type
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::PaymentSucceeded => Self::PAYMENT_SUCCEEDED,
            WebhookEventType::PaymentFailed => Self::PAYMENT_FAILED,
            WebhookEventType::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, WebhookEventType::Unknown(_))
    }
}

impl From<String> for WebhookEventType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<WebhookEventType> for String {
    fn from(event_type: WebhookEventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed webhook event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event ID from provider (absent on hand-built unsigned payloads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Event type
    pub event_type: WebhookEventType,

    /// Opaque event payload (`data` in the envelope)
    pub data: serde_json::Value,

    /// When the provider created the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Whether the event passed signature verification
    pub verified: bool,
}

/// Wire shape of the envelope: `{ id?, type, created?, data }`
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default)]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    data: serde_json::Value,
}

impl WebhookEvent {
    /// Parse an event envelope from the raw request body.
    ///
    /// A missing `type` maps to `Unknown("")`, which dispatches to nothing.
    /// The envelope must be a JSON object; arrays and scalars are rejected.
    pub fn from_slice(payload: &[u8], verified: bool) -> PaymentResult<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload).map_err(|e| {
            PaymentError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        if !value.is_object() {
            return Err(PaymentError::WebhookParseError(
                "Webhook envelope is not a JSON object".to_string(),
            ));
        }

        let envelope: EventEnvelope = serde_json::from_value(value).map_err(|e| {
            PaymentError::WebhookParseError(format!("Failed to parse webhook: {}", e))
        })?;

        Ok(Self {
            event_id: envelope.id,
            event_type: WebhookEventType::from_tag(&envelope.event_type),
            data: envelope.data,
            created: envelope
                .created
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            verified,
        })
    }

    /// The object the event is about (`data.object`)
    pub fn object(&self) -> Option<&serde_json::Value> {
        self.data.get("object")
    }

    /// Payment intent ID, when the event object is a payment intent
    pub fn payment_intent_id(&self) -> Option<&str> {
        let object = self.object()?;
        match object.get("object").and_then(|v| v.as_str()) {
            Some("payment_intent") | None => object.get("id").and_then(|v| v.as_str()),
            Some(_) => None,
        }
    }

    /// Amount on the event object (smallest currency unit)
    pub fn amount(&self) -> Option<i64> {
        self.object()?.get("amount").and_then(|v| v.as_i64())
    }

    /// Decline message on a failed payment intent
    pub fn failure_message(&self) -> Option<&str> {
        self.object()?
            .get("last_payment_error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_mapping() {
        assert_eq!(
            WebhookEventType::from_tag("payment_intent.succeeded"),
            WebhookEventType::PaymentSucceeded
        );
        assert_eq!(
            WebhookEventType::from_tag("payment_intent.payment_failed"),
            WebhookEventType::PaymentFailed
        );
        assert_eq!(
            WebhookEventType::from_tag("charge.refunded"),
            WebhookEventType::Unknown("charge.refunded".to_string())
        );
        assert_eq!(
            WebhookEventType::Unknown("charge.refunded".into()).as_str(),
            "charge.refunded"
        );
        assert!(!WebhookEventType::from_tag("invoice.paid").is_known());
    }

    #[test]
    fn test_parse_signed_envelope() {
        let payload = br#"{
            "id": "evt_123",
            "object": "event",
            "type": "payment_intent.payment_failed",
            "created": 1700000000,
            "data": {
                "object": {
                    "id": "pi_456",
                    "object": "payment_intent",
                    "amount": 5999,
                    "last_payment_error": { "message": "Your card was declined." }
                }
            }
        }"#;

        let event = WebhookEvent::from_slice(payload, true).unwrap();

        assert_eq!(event.event_id.as_deref(), Some("evt_123"));
        assert_eq!(event.event_type, WebhookEventType::PaymentFailed);
        assert_eq!(event.payment_intent_id(), Some("pi_456"));
        assert_eq!(event.amount(), Some(5999));
        assert_eq!(event.failure_message(), Some("Your card was declined."));
        assert_eq!(event.created.map(|c| c.timestamp()), Some(1700000000));
        assert!(event.verified);
    }

    #[test]
    fn test_parse_bare_envelope() {
        let payload = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let event = WebhookEvent::from_slice(payload, false).unwrap();

        assert!(event.event_id.is_none());
        assert_eq!(event.event_type, WebhookEventType::PaymentSucceeded);
        assert_eq!(event.payment_intent_id(), Some("pi_1"));
        assert!(!event.verified);
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let event = WebhookEvent::from_slice(br#"{"data":{}}"#, false).unwrap();
        assert_eq!(event.event_type, WebhookEventType::Unknown(String::new()));
    }

    #[test]
    fn test_non_payment_intent_object() {
        let payload = br#"{"type":"charge.refunded","data":{"object":{"id":"ch_1","object":"charge"}}}"#;
        let event = WebhookEvent::from_slice(payload, false).unwrap();
        assert_eq!(event.payment_intent_id(), None);
    }

    #[test]
    fn test_rejects_non_json() {
        let err = WebhookEvent::from_slice(b"type=payment_intent.succeeded", false).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParseError(_)));
    }

    #[test]
    fn test_rejects_non_object_envelope() {
        let payloads: [&[u8]; 3] = [
            br#"[null,"payment_intent.succeeded"]"#,
            br#""payment_intent.succeeded""#,
            b"42",
        ];
        for payload in payloads {
            let err = WebhookEvent::from_slice(payload, false).unwrap_err();
            assert!(matches!(err, PaymentError::WebhookParseError(_)));
        }
    }
}
