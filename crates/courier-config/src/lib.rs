// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Courier delivery core.
//!
//! Layered TOML + environment loading via Figment, serde-default model
//! structs, post-deserialization validation, and miette diagnostics.

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CourierConfig;
pub use validation::validate_config;

/// Load configuration from the standard hierarchy and validate it.
///
/// The single entry point used by the binary: any parse or validation
/// failure comes back as a list of renderable [`ConfigError`]s.
pub fn load_and_validate() -> Result<CourierConfig, Vec<ConfigError>> {
    let config = load_config().map_err(|e| {
        vec![ConfigError::Parse {
            message: e.to_string(),
        }]
    })?;
    validate_config(&config)?;
    Ok(config)
}
