// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constant-time comparison for the internal dispatch shared secret.
//!
//! Not an HMAC scheme; the dispatch trigger is an internal endpoint guarded
//! by a simple shared secret, and only the comparison needs to avoid timing
//! leaks.

/// Constant-time byte equality. Always walks every byte of `a`; unequal
/// lengths fail without an early return on content.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
