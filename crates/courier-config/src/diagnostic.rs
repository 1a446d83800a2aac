// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Converts Figment deserialization errors and semantic validation failures
//! into miette diagnostics so startup failures render with codes and help
//! text instead of a bare Debug dump.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic metadata.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// Figment failed to parse or deserialize the configuration.
    #[error("failed to load configuration: {message}")]
    #[diagnostic(
        code(courier::config::parse),
        help("check courier.toml syntax and COURIER_* environment variables")
    )]
    Parse {
        /// Figment's error description, including the offending key path.
        message: String,
    },

    /// The configuration deserialized but failed a semantic constraint.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(courier::config::validation))]
    Validation {
        /// Description of the violated constraint.
        message: String,
    },
}

/// Render collected configuration errors to stderr via miette.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        let report = miette::Report::msg(format!("{error}"));
        eprintln!("{report:?}");
    }
    eprintln!(
        "courier: {} configuration error(s) -- refusing to start",
        errors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_includes_message() {
        let e = ConfigError::Parse {
            message: "invalid type: found string, expected u16 for key \"server.port\"".into(),
        };
        assert!(e.to_string().contains("server.port"));
    }
}
