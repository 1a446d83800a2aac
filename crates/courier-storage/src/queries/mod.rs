// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod contacts;
pub mod conversations;
pub mod messages;
pub mod outbox;
pub mod preferences;
pub mod tenants;

/// Parse a TEXT column into a strum enum, mapping failures onto the rusqlite
/// conversion error so they surface through the normal query error path.
pub(crate) fn parse_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
