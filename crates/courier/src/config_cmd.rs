// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier config` command implementation.
//!
//! The configuration is already loaded and validated by the time this runs;
//! the command prints the effective merged result so operators can see what
//! the server would actually use.

use courier_config::model::CourierConfig;
use courier_core::CourierError;

pub fn run_config(config: &CourierConfig) -> Result<(), CourierError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| CourierError::Internal(format!("failed to render config: {e}")))?;
    println!("# effective configuration");
    print!("{rendered}");
    Ok(())
}
