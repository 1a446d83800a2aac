// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verifiers for the Courier delivery core.
//!
//! Pure functions only: verification takes the already-extracted fields and
//! a caller-supplied clock, so every path is unit-testable with fixed
//! timestamps. Callers map failures to HTTP 403 and handle the
//! verification-disabled configuration toggle themselves.

pub mod email;
pub mod secret;
pub mod sms;

pub use email::{check_freshness, sign_email, verify_email_signature, EmailSignature};
pub use secret::constant_time_eq;
pub use sms::{sign_sms, signing_payload, verify_sms_signature};
