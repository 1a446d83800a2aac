// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email provider webhook verification: timestamp/token/signature scheme.
//!
//! The provider signs `timestamp + token` with HMAC-SHA256 under the webhook
//! signing key and hex-encodes the digest. Freshness is checked separately so
//! a captured payload cannot be replayed outside the skew window.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use courier_core::CourierError;

type HmacSha256 = Hmac<Sha256>;

/// Signature fields as delivered by the provider, either from the JSON
/// `signature` object (events webhook) or from multipart form fields
/// (inbound-mail webhook).
#[derive(Debug, Clone)]
pub struct EmailSignature {
    /// Unix-epoch seconds, as the provider sends it (string on the wire).
    pub timestamp: String,
    pub token: String,
    /// Hex-encoded HMAC-SHA256 digest.
    pub signature: String,
}

/// Verify a provider signature in constant time.
pub fn verify_email_signature(
    signing_key: &str,
    sig: &EmailSignature,
) -> Result<(), CourierError> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .map_err(|_| CourierError::Internal("HMAC accepts any key length".into()))?;
    mac.update(sig.timestamp.as_bytes());
    mac.update(sig.token.as_bytes());

    let provided = hex::decode(&sig.signature)
        .map_err(|_| CourierError::InvalidSignature("signature is not valid hex".into()))?;

    // verify_slice is a constant-time comparison.
    mac.verify_slice(&provided)
        .map_err(|_| CourierError::InvalidSignature("email webhook signature mismatch".into()))
}

/// Check the signed timestamp against the skew window. Exactly `max_skew`
/// seconds of skew is still fresh; one more second is stale.
pub fn check_freshness(
    timestamp: &str,
    now_epoch_secs: i64,
    max_skew_secs: i64,
) -> Result<(), CourierError> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| CourierError::InvalidSignature("timestamp is not numeric".into()))?;
    let age = (now_epoch_secs - ts).abs();
    if age > max_skew_secs {
        return Err(CourierError::StaleTimestamp {
            age_secs: age,
            max_skew_secs,
        });
    }
    Ok(())
}

/// Produce the hex signature for (timestamp, token) under `signing_key`.
/// Used by tests and webhook fixtures.
pub fn sign_email(signing_key: &str, timestamp: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
