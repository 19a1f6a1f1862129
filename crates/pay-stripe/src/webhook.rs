//! # Stripe Webhook Handling
//!
//! Signature verification for Stripe webhooks, and the handler seam that
//! verified events are dispatched to.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 under the
//! endpoint's signing secret and sends `Stripe-Signature: t=...,v1=...`.
//! Verification runs over the exact bytes received; re-serialising the
//! JSON first breaks it.

use hmac::{Hmac, Mac};
use pay_core::{PaymentError, PaymentResult, WebhookEvent, WebhookEventType};
use sha2::Sha256;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed timestamp, matching Stripe's libraries
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Events this server acts on; enable these on the dashboard endpoint
pub const HANDLED_WEBHOOK_EVENTS: &[&str] = &[
    WebhookEventType::PAYMENT_SUCCEEDED,
    WebhookEventType::PAYMENT_FAILED,
];

// =============================================================================
// Webhook Signature Verification
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = value.parse().ok();
            }
            "v1" => {
                // Undecodable entries can never match; skip them
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> PaymentResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex signature Stripe would send for `payload` at `timestamp`
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> PaymentResult<String> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Full `Stripe-Signature` header value for `payload` (local tooling and tests)
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> PaymentResult<String> {
    Ok(format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)?
    ))
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// `now` is the current unix time; any `v1` entry may match, which lets
/// Stripe sign with both secrets during a rotation.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> PaymentResult<()> {
    let sig_parts = parse_signature_header(header)?;
    let mac = signed_payload_mac(secret, sig_parts.timestamp, payload)?;

    // Constant-time comparison
    let valid = sig_parts
        .signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());

    if !valid {
        return Err(PaymentError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    if tolerance_secs > 0 && now.saturating_sub(sig_parts.timestamp) > tolerance_secs {
        return Err(PaymentError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    Ok(())
}

/// Verify the signature, then parse the event from the same bytes.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> PaymentResult<WebhookEvent> {
    verify_signature(payload, header, secret, tolerance_secs, now)?;

    let event = WebhookEvent::from_slice(payload, true)?;
    debug!("Verified Stripe webhook: type={}", event.event_type);
    Ok(event)
}

// =============================================================================
// Dispatch
// =============================================================================

/// Webhook event handler trait
///
/// Implement this trait to fulfil orders, e-mail receipts and so on.
/// Returning an error makes the endpoint answer 500 so Stripe redelivers.
pub trait WebhookHandler: Send + Sync {
    /// Called when a payment succeeds (funds captured)
    fn on_payment_succeeded(&self, event: &WebhookEvent) -> PaymentResult<()> {
        info!(
            payment_intent = ?event.payment_intent_id(),
            amount = ?event.amount(),
            "💰 Payment captured!"
        );
        Ok(())
    }

    /// Called when a payment fails
    fn on_payment_failed(&self, event: &WebhookEvent) -> PaymentResult<()> {
        warn!(
            payment_intent = ?event.payment_intent_id(),
            reason = ?event.failure_message(),
            "❌ Payment failed."
        );
        Ok(())
    }

    /// Called for unknown/unhandled events
    fn on_unknown_event(&self, event: &WebhookEvent) -> PaymentResult<()> {
        debug!("Unhandled webhook event: {}", event.event_type);
        Ok(())
    }
}

/// Default webhook handler (just logs events)
pub struct LoggingWebhookHandler;

impl WebhookHandler for LoggingWebhookHandler {}

/// Dispatch a webhook event to the appropriate handler method
pub fn dispatch_webhook_event(
    handler: &dyn WebhookHandler,
    event: &WebhookEvent,
) -> PaymentResult<()> {
    match &event.event_type {
        WebhookEventType::PaymentSucceeded => handler.on_payment_succeeded(event),
        WebhookEventType::PaymentFailed => handler.on_payment_failed(event),
        WebhookEventType::Unknown(_) => handler.on_unknown_event(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;
    const PAYLOAD: &[u8] =
        br#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{"object":{"id":"pi_1","object":"payment_intent","amount":5999}}}"#;

    #[test]
    fn test_parse_signature_header() {
        let header = "t=1234567890,v1=abc123,v1=def456,v0=ffff";
        let parsed = parse_signature_header(header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], vec![0xab, 0xc1, 0x23]);
    }

    #[test]
    fn test_parse_signature_header_errors() {
        assert!(parse_signature_header("v1=abc123").is_err());
        assert!(parse_signature_header("t=123").is_err());
        assert!(parse_signature_header("t=123,v1=not-hex").is_err());
        assert!(parse_signature_header("").is_err());
    }

    #[test]
    fn test_compute_signature() {
        let sig = compute_signature(SECRET, NOW, b"{}").unwrap();

        // Should produce a 64-character hex string
        assert_eq!(sig.len(), 64);
        assert_ne!(sig, compute_signature(SECRET, NOW + 1, b"{}").unwrap());
    }

    #[test]
    fn test_valid_signature() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW + 10).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let good = compute_signature(SECRET, NOW, PAYLOAD).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good);
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());
    }

    #[test]
    fn test_altered_body_rejected() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        let altered = String::from_utf8_lossy(PAYLOAD).replace("5999", "1");

        let err = verify_signature(altered.as_bytes(), &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW)
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_reserialized_body_rejected() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        let value: serde_json::Value = serde_json::from_slice(PAYLOAD).unwrap();
        let reserialized = serde_json::to_vec_pretty(&value).unwrap();

        assert!(
            verify_signature(&reserialized, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_err()
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let header = signature_header("whsec_other", NOW, PAYLOAD).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        let err = verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW + 301)
            .unwrap_err();
        assert!(err.to_string().contains("tolerance"));

        // Zero tolerance disables the age check
        assert!(verify_signature(PAYLOAD, &header, SECRET, 0, NOW + 10_000).is_ok());
    }

    #[test]
    fn test_future_timestamp_accepted() {
        // Sender clock ahead of ours; only age is bounded
        let header = signature_header(SECRET, NOW + 600, PAYLOAD).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_ok());

        let header = signature_header(SECRET, i64::MIN, PAYLOAD).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).is_err());
    }

    #[test]
    fn test_construct_event() {
        let header = signature_header(SECRET, NOW, PAYLOAD).unwrap();
        let event = construct_event(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW).unwrap();

        assert!(event.verified);
        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
        assert_eq!(event.event_type, WebhookEventType::PaymentSucceeded);
    }

    #[test]
    fn test_signed_non_json_is_parse_error() {
        let header = signature_header(SECRET, NOW, b"not json").unwrap();
        let err = construct_event(b"not json", &header, SECRET, DEFAULT_TOLERANCE_SECS, NOW)
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParseError(_)));
    }

    #[derive(Default)]
    struct CountingHandler {
        succeeded: AtomicUsize,
        failed: AtomicUsize,
        unknown: AtomicUsize,
    }

    impl WebhookHandler for CountingHandler {
        fn on_payment_succeeded(&self, _event: &WebhookEvent) -> PaymentResult<()> {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_payment_failed(&self, _event: &WebhookEvent) -> PaymentResult<()> {
            self.failed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_unknown_event(&self, _event: &WebhookEvent) -> PaymentResult<()> {
            self.unknown.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event_of(tag: &str) -> WebhookEvent {
        let payload = format!(r#"{{"type":"{}","data":{{}}}}"#, tag);
        WebhookEvent::from_slice(payload.as_bytes(), false).unwrap()
    }

    #[test]
    fn test_dispatch_webhook() {
        let handler = CountingHandler::default();

        dispatch_webhook_event(&handler, &event_of("payment_intent.succeeded")).unwrap();
        dispatch_webhook_event(&handler, &event_of("payment_intent.payment_failed")).unwrap();
        dispatch_webhook_event(&handler, &event_of("charge.refunded")).unwrap();

        assert_eq!(handler.succeeded.load(Ordering::SeqCst), 1);
        assert_eq!(handler.failed.load(Ordering::SeqCst), 1);
        assert_eq!(handler.unknown.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_logging_handler_never_fails() {
        let handler = LoggingWebhookHandler;
        for tag in ["payment_intent.succeeded", "payment_intent.payment_failed", "x.y"] {
            assert!(dispatch_webhook_event(&handler, &event_of(tag)).is_ok());
        }
    }
}
