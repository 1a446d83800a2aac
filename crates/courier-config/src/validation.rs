// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints serde attributes cannot express: IANA
//! timezone names, positive caps and limits, non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CourierConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected validation errors rather than failing fast, so a
/// broken config file surfaces every problem in one run.
pub fn validate_config(config: &CourierConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    let level = config.server.log_level.as_str();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level must be one of trace/debug/info/warn/error, got `{level}`"
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.webhooks.max_skew_secs < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "webhooks.max_skew_secs must be non-negative, got {}",
                config.webhooks.max_skew_secs
            ),
        });
    }

    if config.policy.default_hourly_cap < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.default_hourly_cap must be at least 1, got {}",
                config.policy.default_hourly_cap
            ),
        });
    }

    if config.policy.default_daily_cap < config.policy.default_hourly_cap {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.default_daily_cap ({}) must not be lower than default_hourly_cap ({})",
                config.policy.default_daily_cap, config.policy.default_hourly_cap
            ),
        });
    }

    if config.policy.default_dedupe_minutes < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.default_dedupe_minutes must be non-negative, got {}",
                config.policy.default_dedupe_minutes
            ),
        });
    }

    if config.policy.default_timezone.parse::<chrono_tz::Tz>().is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.default_timezone `{}` is not a valid IANA timezone",
                config.policy.default_timezone
            ),
        });
    }

    if config.dispatch.batch_limit < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.batch_limit must be at least 1, got {}",
                config.dispatch.batch_limit
            ),
        });
    }

    if config.dispatch.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "dispatch.max_attempts must be at least 1, got {}",
                config.dispatch.max_attempts
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
