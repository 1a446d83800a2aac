// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Courier delivery core.

use thiserror::Error;

/// The primary error type used across all Courier crates.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Configuration errors (invalid TOML, missing required fields, missing
    /// secrets while verification is enabled).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A webhook signature did not verify against the recomputed digest.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A signed webhook timestamp fell outside the allowed skew window.
    #[error("stale timestamp: age {age_secs}s exceeds max skew {max_skew_secs}s")]
    StaleTimestamp { age_secs: i64, max_skew_secs: i64 },

    /// Provider adapter errors (HTTP failure, non-2xx response). The raw
    /// provider response text is carried in `message` for diagnosability.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A lookup key (tenant phone mapping, message id) did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed or incomplete request payloads.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
