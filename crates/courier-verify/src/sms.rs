// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS provider webhook verification: request-signing scheme.
//!
//! The provider signs the full callback URL concatenated with every POST
//! parameter as `key` + `value`, keys sorted lexicographically, using
//! HMAC-SHA1 under the account auth token, base64-encoded into the
//! `X-*-Signature` header.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use courier_core::CourierError;

type HmacSha1 = Hmac<Sha1>;

/// Build the string the provider signs: URL plus sorted key/value pairs.
/// A `BTreeMap` input keeps the sort an invariant of the type.
pub fn signing_payload(url: &str, params: &BTreeMap<String, String>) -> String {
    let mut data = String::from(url);
    for (key, value) in params {
        data.push_str(key);
        data.push_str(value);
    }
    data
}

/// Verify the signature header in constant time.
pub fn verify_sms_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    signature_b64: &str,
) -> Result<(), CourierError> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .map_err(|_| CourierError::Internal("HMAC accepts any key length".into()))?;
    mac.update(signing_payload(url, params).as_bytes());

    let provided = BASE64
        .decode(signature_b64)
        .map_err(|_| CourierError::InvalidSignature("signature is not valid base64".into()))?;

    mac.verify_slice(&provided)
        .map_err(|_| CourierError::InvalidSignature("sms webhook signature mismatch".into()))
}

/// Produce the base64 signature the provider would send. Used by tests.
pub fn sign_sms(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(signing_payload(url, params).as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
