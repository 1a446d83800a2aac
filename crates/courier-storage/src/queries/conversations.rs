// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.
//!
//! A conversation scopes one channel between one contact and the tenant; the
//! channel is immutable once created. Threading reuses the most-recently
//! updated conversation for (tenant, contact, channel).

use courier_core::{Channel, Conversation, CourierError};
use rusqlite::params;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_enum;

const CONV_COLS: &str =
    "id, tenant_id, contact_id, channel, subject, status, metadata, created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact_id: row.get(2)?,
        channel: parse_enum(3, row.get(3)?)?,
        subject: row.get(4)?,
        status: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Most-recently-updated conversation for (tenant, contact, channel), if any.
pub async fn find_latest(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
) -> Result<Option<Conversation>, CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONV_COLS} FROM conversations
                 WHERE tenant_id = ?1 AND contact_id = ?2 AND channel = ?3
                 ORDER BY updated_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![tenant_id, contact_id, channel], row_to_conversation) {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Reuse the latest conversation for (tenant, contact, channel) or create one
/// with the given subject. Lookup and insert run in one transaction on the
/// single writer thread, so concurrent resolvers cannot create duplicates.
pub async fn find_or_create(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
    subject: &str,
) -> Result<Conversation, CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel_str = channel.to_string();
    let subject = subject.to_string();
    let new_id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {CONV_COLS} FROM conversations
                     WHERE tenant_id = ?1 AND contact_id = ?2 AND channel = ?3
                     ORDER BY updated_at DESC LIMIT 1"
                ))?;
                match stmt.query_row(
                    params![tenant_id, contact_id, channel_str],
                    row_to_conversation,
                ) {
                    Ok(c) => Some(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let conversation = match existing {
                Some(c) => c,
                None => {
                    tx.execute(
                        "INSERT INTO conversations (id, tenant_id, contact_id, channel, subject)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![new_id, tenant_id, contact_id, channel_str, subject],
                    )?;
                    let mut stmt = tx.prepare(&format!(
                        "SELECT {CONV_COLS} FROM conversations WHERE id = ?1"
                    ))?;
                    stmt.query_row(params![new_id], row_to_conversation)?
                }
            };

            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a conversation's updated_at, keeping the threading lookup current.
pub async fn touch(db: &Database, id: &str) -> Result<(), CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
