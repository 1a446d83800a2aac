// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff schedule for failed outbox rows.

/// Base delay before the first retry.
const BASE_SECS: i64 = 60;

/// Upper bound on a single retry delay (one hour).
const MAX_SECS: i64 = 3600;

/// Delay before the next attempt, given how many attempts have already
/// failed. Doubles per failure from one minute, capped at one hour.
pub fn backoff_secs(prior_attempts: i64) -> i64 {
    let shift = prior_attempts.clamp(0, 30) as u32;
    BASE_SECS.saturating_mul(1_i64 << shift).min(MAX_SECS)
}
