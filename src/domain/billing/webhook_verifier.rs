//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header carries `t=<unix secs>,v1=<hex hmac>`; the
//! signed message is `"{t}.{raw body}"` under HMAC-SHA256 with the endpoint
//! secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Events older than this are rejected as replays.
const MAX_EVENT_AGE_SECS: i64 = 300;

const MAX_CLOCK_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Every `v1` entry; Stripe sends several while a secret is being rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 and future schemes
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

pub struct StripeWebhookVerifier {
    secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks the signature and freshness, then parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())?;
        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        if header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate))
        {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::NotConfigured)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn validate_timestamp(timestamp: i64, now: i64) -> Result<(), WebhookError> {
    let age = now - timestamp;
    if age > MAX_EVENT_AGE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }
    Ok(())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Builds a valid `Stripe-Signature` header for fixtures.
#[cfg(test)]
pub fn sign_for_test(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::stripe_event::event_json;

    const SECRET: &str = "whsec_test_secret_12345";

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    // ══════════════════════════════════════════════════════════════
    // Header parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_collects_all_v1_entries() {
        let header = format!(
            "t=1234567890,v1={},v0={},v1={}",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64)
        );
        let parsed = SignatureHeader::parse(&header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.v1_signatures.len(), 2);
        assert_eq!(parsed.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_rejects_malformed_input() {
        for header in [
            "v1=aaaa".to_string(),
            "t=1234567890".to_string(),
            format!("t=soon,v1={}", "a".repeat(64)),
            "t=1234567890,v1=not_hex".to_string(),
            "t1234567890".to_string(),
        ] {
            assert!(
                matches!(SignatureHeader::parse(&header), Err(WebhookError::ParseError(_))),
                "{header}"
            );
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Verification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_parses_event() {
        let verifier = StripeWebhookVerifier::new(SECRET);
        let payload =
            event_json("evt_ok", "invoice.payment_failed", serde_json::json!({"id": "in_1"}));
        let header = sign_for_test(SECRET, now(), &payload);

        let event = verifier.verify_and_parse(payload.as_bytes(), &header).unwrap();
        assert_eq!(event.id, "evt_ok");
    }

    #[test]
    fn rolled_secret_second_signature_accepted() {
        let verifier = StripeWebhookVerifier::new(SECRET);
        let payload = r#"{"id":"evt"}"#;
        let ts = now();
        let good = sign_for_test(SECRET, ts, payload);
        let header = format!("t={},v1={},{}", ts, "0".repeat(64), good.split_once(',').unwrap().1);

        assert!(verifier.verify_at(payload.as_bytes(), &header, ts).is_ok());
    }

    #[test]
    fn wrong_secret_or_tampered_payload_rejected() {
        let verifier = StripeWebhookVerifier::new(SECRET);
        let ts = now();
        let header = sign_for_test("whsec_other", ts, r#"{"id":"evt"}"#);
        assert!(matches!(
            verifier.verify_at(br#"{"id":"evt"}"#, &header, ts),
            Err(WebhookError::InvalidSignature)
        ));

        let header = sign_for_test(SECRET, ts, r#"{"id":"evt"}"#);
        assert!(matches!(
            verifier.verify_at(br#"{"id":"evt_hacked"}"#, &header, ts),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn invalid_json_after_valid_signature() {
        let verifier = StripeWebhookVerifier::new(SECRET);
        let header = sign_for_test(SECRET, now(), "not json");
        assert!(matches!(
            verifier.verify_and_parse(b"not json", &header),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp window
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_window_boundaries() {
        let now = 1_700_000_000;
        assert!(validate_timestamp(now - 300, now).is_ok());
        assert!(matches!(
            validate_timestamp(now - 301, now),
            Err(WebhookError::TimestampOutOfRange)
        ));
        assert!(validate_timestamp(now + 60, now).is_ok());
        assert!(matches!(
            validate_timestamp(now + 61, now),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn constant_time_compare_lengths() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
        assert!(!constant_time_compare(&[1, 2], &[1, 2, 3]));
    }
}
