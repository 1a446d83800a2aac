// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message, message-event, and attachment operations.
//!
//! Outbound status transitions are monotonic: `queued -> sent -> delivered`
//! or `queued -> failed`, with delivered/failed terminal. The patch query
//! guards terminal states in SQL so late or duplicated provider events
//! cannot regress a message.

use courier_core::{
    Channel, CourierError, Direction, Message, MessageAttachment, MessageStatus,
};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_enum;

const MESSAGE_COLS: &str = "id, tenant_id, conversation_id, contact_id, direction, channel, \
     provider, provider_message_id, status, subject, body_text, body_html, from_address, \
     to_address, metadata, created_at, sent_at, delivered_at, failed_at, received_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        conversation_id: row.get(2)?,
        contact_id: row.get(3)?,
        direction: parse_enum(4, row.get(4)?)?,
        channel: parse_enum(5, row.get(5)?)?,
        provider: row.get(6)?,
        provider_message_id: row.get(7)?,
        status: parse_enum(8, row.get(8)?)?,
        subject: row.get(9)?,
        body_text: row.get(10)?,
        body_html: row.get(11)?,
        from_address: row.get(12)?,
        to_address: row.get(13)?,
        metadata: row.get(14)?,
        created_at: row.get(15)?,
        sent_at: row.get(16)?,
        delivered_at: row.get(17)?,
        failed_at: row.get(18)?,
        received_at: row.get(19)?,
    })
}

/// Insert a new message row. `created_at` and the terminal `received_at` for
/// inbound messages are set by the caller-supplied struct; empty timestamps
/// default to now in SQL.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), CourierError> {
    let m = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, tenant_id, conversation_id, contact_id, direction,
                                       channel, provider, provider_message_id, status, subject,
                                       body_text, body_html, from_address, to_address, metadata,
                                       sent_at, delivered_at, failed_at, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                params![
                    m.id,
                    m.tenant_id,
                    m.conversation_id,
                    m.contact_id,
                    m.direction.to_string(),
                    m.channel.to_string(),
                    m.provider,
                    m.provider_message_id,
                    m.status.to_string(),
                    m.subject,
                    m.body_text,
                    m.body_html,
                    m.from_address,
                    m.to_address,
                    m.metadata,
                    m.sent_at,
                    m.delivered_at,
                    m.failed_at,
                    m.received_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(m) => Ok(Some(m)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, CourierError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(
                params![conversation_id, limit.unwrap_or(-1)],
                row_to_message,
            )?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Patch a message's status from a provider event, stamping the matching
/// timestamp column. Terminal statuses (delivered/failed) are never
/// overwritten. Returns the number of rows updated (0 when the guard or the
/// id missed).
pub async fn patch_status(
    db: &Database,
    id: &str,
    status: MessageStatus,
    provider_message_id: Option<String>,
) -> Result<usize, CourierError> {
    let id = id.to_string();
    let timestamp_col = match status {
        MessageStatus::Sent => "sent_at",
        MessageStatus::Delivered => "delivered_at",
        MessageStatus::Failed => "failed_at",
        MessageStatus::Received => "received_at",
        MessageStatus::Queued => return Ok(0),
    };
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                &format!(
                    "UPDATE messages
                     SET status = ?1,
                         {timestamp_col} = strftime('%Y-%m-%dT%H:%M:%fZ','now'),
                         provider_message_id = COALESCE(?2, provider_message_id)
                     WHERE id = ?3 AND status NOT IN ('delivered', 'failed')"
                ),
                params![status, provider_message_id, id],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Count outbound messages to (tenant, contact, channel) created within the
/// trailing `window_minutes`, in the statuses that count against rate caps.
pub async fn count_outbound_since(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
    window_minutes: i64,
) -> Result<i64, CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel = channel.to_string();
    let modifier = format!("-{window_minutes} minutes");
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE tenant_id = ?1 AND contact_id = ?2 AND channel = ?3
                   AND direction = ?4
                   AND status IN ('queued', 'sent', 'delivered')
                   AND created_at >= strftime('%Y-%m-%dT%H:%M:%fZ','now', ?5)",
                params![
                    tenant_id,
                    contact_id,
                    channel,
                    Direction::Outbound.to_string(),
                    modifier,
                ],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Count outbound messages carrying `dedupe_key` in their metadata within the
/// trailing `window_minutes`, scoped like the cap queries.
pub async fn count_dedupe_matches(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
    channel: Channel,
    dedupe_key: &str,
    window_minutes: i64,
) -> Result<i64, CourierError> {
    let tenant_id = tenant_id.to_string();
    let contact_id = contact_id.to_string();
    let channel = channel.to_string();
    let dedupe_key = dedupe_key.to_string();
    let modifier = format!("-{window_minutes} minutes");
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE tenant_id = ?1 AND contact_id = ?2 AND channel = ?3
                   AND direction = ?4
                   AND json_extract(metadata, '$.dedupe_key') = ?5
                   AND created_at >= strftime('%Y-%m-%dT%H:%M:%fZ','now', ?6)",
                params![
                    tenant_id,
                    contact_id,
                    channel,
                    Direction::Outbound.to_string(),
                    dedupe_key,
                    modifier,
                ],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a provider event to the audit trail. Never mutated or deleted.
pub async fn insert_event(
    db: &Database,
    message_id: &str,
    provider: &str,
    event_type: &str,
    payload: &str,
) -> Result<i64, CourierError> {
    let message_id = message_id.to_string();
    let provider = provider.to_string();
    let event_type = event_type.to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_events (message_id, provider, event_type, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, provider, event_type, payload],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of audit events recorded for a message.
pub async fn count_events(db: &Database, message_id: &str) -> Result<i64, CourierError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM message_events WHERE message_id = ?1",
                params![message_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Record attachment metadata for an inbound email message.
pub async fn insert_attachment(
    db: &Database,
    attachment: &MessageAttachment,
) -> Result<(), CourierError> {
    let a = attachment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO message_attachments (id, message_id, filename, content_type,
                                                  byte_size, storage_key, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    a.id,
                    a.message_id,
                    a.filename,
                    a.content_type,
                    a.byte_size,
                    a.storage_key,
                    a.metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_outbound, seed_contact_conversation, setup_db};

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, conversation) =
            seed_contact_conversation(&db, Channel::Email).await;

        let msg = insert_outbound(
            &db,
            &tenant,
            &contact,
            &conversation,
            Channel::Email,
            MessageStatus::Queued,
            None,
        )
        .await;

        let loaded = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.direction, Direction::Outbound);
        assert_eq!(loaded.status, MessageStatus::Queued);
        assert_eq!(loaded.channel, Channel::Email);
    }

    #[tokio::test]
    async fn patch_status_is_monotonic() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, conversation) =
            seed_contact_conversation(&db, Channel::Email).await;
        let msg = insert_outbound(
            &db,
            &tenant,
            &contact,
            &conversation,
            Channel::Email,
            MessageStatus::Queued,
            None,
        )
        .await;

        assert_eq!(
            patch_status(&db, &msg.id, MessageStatus::Sent, Some("prov-1".into()))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            patch_status(&db, &msg.id, MessageStatus::Delivered, None)
                .await
                .unwrap(),
            1
        );

        // A late "sent" event after delivery must not regress the status.
        assert_eq!(
            patch_status(&db, &msg.id, MessageStatus::Sent, None)
                .await
                .unwrap(),
            0
        );

        let loaded = get_message(&db, &msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MessageStatus::Delivered);
        assert!(loaded.sent_at.is_some());
        assert!(loaded.delivered_at.is_some());
        assert_eq!(loaded.provider_message_id.as_deref(), Some("prov-1"));
    }

    #[tokio::test]
    async fn cap_counting_is_channel_scoped() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, email_conv) =
            seed_contact_conversation(&db, Channel::Email).await;
        let sms_conv = crate::queries::conversations::find_or_create(
            &db,
            &tenant.id,
            &contact.id,
            Channel::Sms,
            "SMS with contact",
        )
        .await
        .unwrap();

        for _ in 0..3 {
            insert_outbound(
                &db,
                &tenant,
                &contact,
                &email_conv,
                Channel::Email,
                MessageStatus::Sent,
                None,
            )
            .await;
        }
        insert_outbound(
            &db,
            &tenant,
            &contact,
            &sms_conv,
            Channel::Sms,
            MessageStatus::Sent,
            None,
        )
        .await;

        let email_count = count_outbound_since(&db, &tenant.id, &contact.id, Channel::Email, 60)
            .await
            .unwrap();
        let sms_count = count_outbound_since(&db, &tenant.id, &contact.id, Channel::Sms, 60)
            .await
            .unwrap();
        assert_eq!(email_count, 3);
        assert_eq!(sms_count, 1);
    }

    #[tokio::test]
    async fn failed_messages_do_not_count_against_caps() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, conversation) =
            seed_contact_conversation(&db, Channel::Sms).await;
        insert_outbound(
            &db,
            &tenant,
            &contact,
            &conversation,
            Channel::Sms,
            MessageStatus::Failed,
            None,
        )
        .await;

        let count = count_outbound_since(&db, &tenant.id, &contact.id, Channel::Sms, 60)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn dedupe_matches_only_same_key() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, conversation) =
            seed_contact_conversation(&db, Channel::Email).await;
        insert_outbound(
            &db,
            &tenant,
            &contact,
            &conversation,
            Channel::Email,
            MessageStatus::Sent,
            Some("welcome-1"),
        )
        .await;

        let hit = count_dedupe_matches(&db, &tenant.id, &contact.id, Channel::Email, "welcome-1", 30)
            .await
            .unwrap();
        let miss = count_dedupe_matches(&db, &tenant.id, &contact.id, Channel::Email, "welcome-2", 30)
            .await
            .unwrap();
        assert_eq!(hit, 1);
        assert_eq!(miss, 0);
    }

    #[tokio::test]
    async fn events_append_per_webhook() {
        let (db, _dir) = setup_db().await;
        let (tenant, contact, conversation) =
            seed_contact_conversation(&db, Channel::Email).await;
        let msg = insert_outbound(
            &db,
            &tenant,
            &contact,
            &conversation,
            Channel::Email,
            MessageStatus::Sent,
            None,
        )
        .await;

        insert_event(&db, &msg.id, "mailgun", "accepted", "{}").await.unwrap();
        insert_event(&db, &msg.id, "mailgun", "delivered", "{}").await.unwrap();
        assert_eq!(count_events(&db, &msg.id).await.unwrap(), 2);
    }
}
