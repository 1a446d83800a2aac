// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification outbox operations.
//!
//! Row lifecycle: `pending -> sending -> sent`, or
//! `pending -> sending -> failed -> pending` with backoff until
//! `attempt_count >= max_attempts` flips the row to `dead`.
//!
//! [`claim_batch`] is the SQLite equivalent of a skip-locked dequeue: the
//! select-and-mark runs in one transaction on the single writer thread, so
//! two concurrent dispatcher invocations never claim the same row. The
//! `locked_until` lease additionally recovers rows stranded in `sending` by
//! a crashed dispatcher.

use courier_core::{Channel, CourierError, OutboxRow, OutboxStatus};
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::parse_enum;

/// Lease duration a claimed row is held in `sending` before a crashed
/// dispatcher's claim expires.
const CLAIM_LEASE: &str = "+5 minutes";

const OUTBOX_COLS: &str = "id, tenant_id, channel, event_key, to_address, subject, body_text, \
     body_html, payload, status, attempt_count, max_attempts, next_attempt_at, last_error, \
     locked_until, created_at, updated_at";

fn row_to_outbox(row: &rusqlite::Row<'_>) -> Result<OutboxRow, rusqlite::Error> {
    Ok(OutboxRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel: parse_enum(2, row.get(2)?)?,
        event_key: row.get(3)?,
        to_address: row.get(4)?,
        subject: row.get(5)?,
        body_text: row.get(6)?,
        body_html: row.get(7)?,
        payload: row.get(8)?,
        status: parse_enum(9, row.get(9)?)?,
        attempt_count: row.get(10)?,
        max_attempts: row.get(11)?,
        next_attempt_at: row.get(12)?,
        last_error: row.get(13)?,
        locked_until: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// Fields for a new outbox row. Produced by internal event producers; the
/// dispatcher is the only consumer of the resulting rows.
#[derive(Debug, Clone)]
pub struct NewOutboxRow {
    pub tenant_id: String,
    pub channel: Channel,
    pub event_key: String,
    pub to_address: String,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub payload: Option<String>,
    pub max_attempts: i64,
}

/// Enqueue a pending send. Returns the auto-generated row id.
pub async fn enqueue(db: &Database, row: &NewOutboxRow) -> Result<i64, CourierError> {
    let r = row.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO outbox (tenant_id, channel, event_key, to_address, subject,
                                     body_text, body_html, payload, max_attempts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    r.tenant_id,
                    r.channel.to_string(),
                    r.event_key,
                    r.to_address,
                    r.subject,
                    r.body_text,
                    r.body_html,
                    r.payload,
                    r.max_attempts,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim up to `limit` due rows for this dispatcher invocation, marking each
/// `sending` with a lease before returning them. Rows left in `sending` past
/// their lease by a crashed dispatcher are claimed again.
pub async fn claim_batch(db: &Database, limit: i64) -> Result<Vec<OutboxRow>, CourierError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {OUTBOX_COLS} FROM outbox
                     WHERE (status = 'pending'
                            AND next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ','now'))
                        OR (status = 'sending'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ','now'))
                     ORDER BY id ASC
                     LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit], row_to_outbox)?;
                let mut claimed = Vec::new();
                for row in rows {
                    claimed.push(row?);
                }
                claimed
            };

            for row in &claimed {
                tx.execute(
                    &format!(
                        "UPDATE outbox SET status = 'sending',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ','now','{CLAIM_LEASE}'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                         WHERE id = ?1"
                    ),
                    params![row.id],
                )?;
            }

            tx.commit()?;
            Ok(claimed
                .into_iter()
                .map(|row| OutboxRow {
                    status: OutboxStatus::Sending,
                    ..row
                })
                .collect())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a claimed row sent (terminal success).
pub async fn mark_sent(db: &Database, id: i64) -> Result<(), CourierError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE outbox SET status = 'sent', locked_until = NULL, last_error = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed attempt. Increments `attempt_count`; the row returns to
/// `pending` with `next_attempt_at` pushed out by `backoff_secs`, or goes
/// `dead` once attempts reach `max_attempts`.
pub async fn mark_failed(
    db: &Database,
    id: i64,
    error: &str,
    backoff_secs: i64,
) -> Result<OutboxStatus, CourierError> {
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i64, i64) = conn.query_row(
                "SELECT attempt_count, max_attempts FROM outbox WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE outbox SET status = 'dead', attempt_count = ?1, last_error = ?2,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                     WHERE id = ?3",
                    params![new_attempts, error, id],
                )?;
                Ok(OutboxStatus::Dead)
            } else {
                let modifier = format!("+{backoff_secs} seconds");
                conn.execute(
                    "UPDATE outbox SET status = 'pending', attempt_count = ?1, last_error = ?2,
                     locked_until = NULL,
                     next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ','now', ?3),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                     WHERE id = ?4",
                    params![new_attempts, error, modifier, id],
                )?;
                Ok(OutboxStatus::Pending)
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one outbox row by id.
pub async fn get_row(db: &Database, id: i64) -> Result<Option<OutboxRow>, CourierError> {
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {OUTBOX_COLS} FROM outbox WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_outbox) {
                Ok(r) => Ok(Some(r)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tenants::create_tenant;
    use crate::test_support::{make_tenant, setup_db};

    fn new_row(tenant_id: &str, max_attempts: i64) -> NewOutboxRow {
        NewOutboxRow {
            tenant_id: tenant_id.into(),
            channel: Channel::Email,
            event_key: "order.created".into(),
            to_address: "buyer@example.com".into(),
            subject: Some("Order received".into()),
            body_text: Some("Thanks for your order.".into()),
            body_html: None,
            payload: Some(r#"{"order":{"id":"o-1"}}"#.into()),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn claim_marks_sending_and_excludes_reclaim() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let id = enqueue(&db, &new_row("t-1", 3)).await.unwrap();

        let batch = claim_batch(&db, 25).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].status, OutboxStatus::Sending);

        // A second dispatcher invocation sees nothing.
        let batch = claim_batch(&db, 25).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn expired_lease_reclaims_stranded_sending_row() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let id = enqueue(&db, &new_row("t-1", 3)).await.unwrap();

        let batch = claim_batch(&db, 25).await.unwrap();
        assert_eq!(batch.len(), 1);

        // Simulate a dispatcher that died after claiming: the row sits in
        // `sending` with its lease expired.
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE outbox
                     SET locked_until = strftime('%Y-%m-%dT%H:%M:%fZ','now','-1 hours')
                     WHERE id = ?1",
                    params![id],
                )
            })
            .await
            .unwrap();

        let batch = claim_batch(&db, 25).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].status, OutboxStatus::Sending);

        // The fresh claim carries a new live lease, so a third invocation
        // sees nothing.
        let row = get_row(&db, id).await.unwrap().unwrap();
        assert!(row.locked_until.is_some());
        assert!(claim_batch(&db, 25).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_respects_limit_and_order() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let first = enqueue(&db, &new_row("t-1", 3)).await.unwrap();
        let _second = enqueue(&db, &new_row("t-1", 3)).await.unwrap();

        let batch = claim_batch(&db, 1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, first);
    }

    #[tokio::test]
    async fn failed_attempt_retries_with_backoff() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let id = enqueue(&db, &new_row("t-1", 3)).await.unwrap();
        let _ = claim_batch(&db, 25).await.unwrap();

        let status = mark_failed(&db, id, "provider 500", 60).await.unwrap();
        assert_eq!(status, OutboxStatus::Pending);

        let row = get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.attempt_count, 1);
        assert_eq!(row.last_error.as_deref(), Some("provider 500"));
        assert!(row.next_attempt_at > row.created_at);

        // Backed-off row is not yet due.
        let batch = claim_batch(&db, 25).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn row_goes_dead_at_max_attempts_and_stays_excluded() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let id = enqueue(&db, &new_row("t-1", 2)).await.unwrap();

        let _ = claim_batch(&db, 25).await.unwrap();
        assert_eq!(
            mark_failed(&db, id, "timeout", 0).await.unwrap(),
            OutboxStatus::Pending
        );
        let _ = claim_batch(&db, 25).await.unwrap();
        assert_eq!(
            mark_failed(&db, id, "timeout", 0).await.unwrap(),
            OutboxStatus::Dead
        );

        let row = get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Dead);
        assert_eq!(row.attempt_count, 2);

        // Dead rows are excluded even though next_attempt_at has passed.
        let batch = claim_batch(&db, 25).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn mark_sent_is_terminal() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();
        let id = enqueue(&db, &new_row("t-1", 3)).await.unwrap();
        let _ = claim_batch(&db, 25).await.unwrap();
        mark_sent(&db, id).await.unwrap();

        let row = get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Sent);
        assert!(row.locked_until.is_none());
        assert!(claim_batch(&db, 25).await.unwrap().is_empty());
    }
}
