// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-preference (consent) operations.
//!
//! One row per (tenant, contact, channel), upserted in place. Opt-outs come
//! from SMS STOP keywords and email unsubscribe/complaint events.

use courier_core::{Channel, ChannelPreference, ConsentStatus, CourierError};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_enum;

/// Insert or update the consent record for (tenant, contact, channel).
pub async fn upsert_preference(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
    consent_status: ConsentStatus,
    consent_source: &str,
) -> Result<(), CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel = channel.to_string();
    let consent_status = consent_status.to_string();
    let consent_source = consent_source.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO channel_preferences
                     (tenant_id, contact_id, channel, consent_status, consent_source)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(tenant_id, contact_id, channel) DO UPDATE SET
                     consent_status = excluded.consent_status,
                     consent_source = excluded.consent_source,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')",
                params![tenant_id, contact_id, channel, consent_status, consent_source],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the consent record, if one exists. Absence means the contact has
/// never expressed a preference and defaults to sendable.
pub async fn get_preference(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
) -> Result<Option<ChannelPreference>, CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, contact_id, channel, consent_status, consent_source, updated_at
                 FROM channel_preferences
                 WHERE tenant_id = ?1 AND contact_id = ?2 AND channel = ?3",
            )?;
            match stmt.query_row(params![tenant_id, contact_id, channel], |row| {
                Ok(ChannelPreference {
                    tenant_id: row.get(0)?,
                    contact_id: row.get(1)?,
                    channel: parse_enum(2, row.get(2)?)?,
                    // Consent comparisons are case-insensitive; normalize at
                    // the row boundary so externally-written casing still parses.
                    consent_status: parse_enum(3, row.get::<_, String>(3)?.to_lowercase())?,
                    consent_source: row.get(4)?,
                    updated_at: row.get(5)?,
                })
            }) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
