//! Gateway webhook signature verification.
//!
//! Verifies the authenticity proof on inbound gateway deliveries using
//! HMAC-SHA256 with constant-time comparison. Timestamp validation bounds
//! the replay window.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Errors raised by signature verification.
///
/// All variants are terminal for the delivery; the engine never retries
/// an authenticity failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("invalid signature header: {0}")]
    Parse(String),

    #[error("signature mismatch")]
    Mismatch,

    #[error("event timestamp outside replay window")]
    Stale,

    #[error("event timestamp in the future")]
    Future,
}

/// Parsed components of the signature header.
///
/// Format: `t=<timestamp>,v1=<hex signature>`. Unknown fields are ignored
/// for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// HMAC-SHA256 signature bytes.
    pub signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a signature header string.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp: Option<i64> = None;
        let mut signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| SignatureError::Parse("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| SignatureError::Parse("invalid timestamp".to_string()))?,
                    );
                }
                "v1" => {
                    signature = Some(hex::decode(value).map_err(|_| {
                        SignatureError::Parse("invalid signature hex".to_string())
                    })?);
                }
                _ => {
                    // Ignore unknown fields for forward compatibility
                }
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SignatureError::Parse("missing timestamp".to_string()))?;
        let signature =
            signature.ok_or_else(|| SignatureError::Parse("missing v1 signature".to_string()))?;

        Ok(SignatureHeader { timestamp, signature })
    }
}

/// Verifier for gateway webhook signatures.
pub struct GatewayEventVerifier {
    /// Webhook signing secret shared with the gateway.
    secret: String,
}

impl GatewayEventVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the signature over the raw payload.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within the replay window
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare signatures using constant-time comparison
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp)?;

        let expected = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected, &header.signature) {
            return Err(SignatureError::Mismatch);
        }

        Ok(())
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64) -> Result<(), SignatureError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(SignatureError::Stale);
        }

        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(SignatureError::Future);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for the given timestamp and payload.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// Prevents timing attacks that could leak the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
