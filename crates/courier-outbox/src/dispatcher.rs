// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outbox dispatcher: claim, render, send, settle.
//!
//! One invocation claims a batch of due rows under a lease, pushes each
//! through its channel's provider adapter, and settles the row as sent or
//! failed. Message rows correlated through the payload's `message_id` are
//! patched alongside. Delivery is at-least-once: a crash between a provider
//! accept and `mark_sent` re-sends after the lease expires.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::{error, info, warn};

use courier_core::{
    CourierError, MessageStatus, OutboxStatus, SendRequest, SenderRegistry, Tenant,
};
use courier_storage::queries::{messages, outbox, tenants};
use courier_storage::Database;

use crate::backoff::backoff_secs;
use crate::render::render;

/// Tally of one dispatcher invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Claim up to `limit` due rows and dispatch them sequentially.
///
/// Per-row failures are settled into the row itself and never abort the
/// batch; only storage-level errors propagate.
pub async fn run_dispatch(
    db: &Database,
    senders: &SenderRegistry,
    limit: i64,
) -> Result<DispatchReport, CourierError> {
    let rows = outbox::claim_batch(db, limit).await?;
    let mut report = DispatchReport {
        claimed: rows.len(),
        ..Default::default()
    };
    if rows.is_empty() {
        return Ok(report);
    }
    info!(claimed = rows.len(), "dispatching outbox batch");

    let mut first = true;
    for row in rows {
        if !first {
            // Brief jitter so a batch does not hammer a provider in lockstep.
            let pause = rand::thread_rng().gen_range(10..=50);
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
        first = false;

        match dispatch_row(db, senders, &row).await? {
            RowOutcome::Sent => report.sent += 1,
            RowOutcome::Failed => report.failed += 1,
        }
    }
    Ok(report)
}

enum RowOutcome {
    Sent,
    Failed,
}

fn payload_value(row: &courier_core::OutboxRow) -> Value {
    row.payload
        .as_deref()
        .and_then(|p| serde_json::from_str(p).ok())
        .unwrap_or(Value::Null)
}

/// Fallback body for rows enqueued without a pre-rendered one.
const DEFAULT_BODY_TEMPLATE: &str = "Event {{event_key}} for {{start_at}}";

fn default_body(row: &courier_core::OutboxRow, payload: &Value) -> String {
    let mut scope = match payload {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    scope.insert("event_key".into(), Value::String(row.event_key.clone()));
    render(DEFAULT_BODY_TEMPLATE, &Value::Object(scope))
}

fn build_request(row: &courier_core::OutboxRow, payload: &Value) -> SendRequest {
    SendRequest {
        channel: row.channel,
        to_address: row.to_address.clone(),
        subject: row.subject.as_deref().map(|s| render(s, payload)),
        body_text: Some(
            row.body_text
                .as_deref()
                .map(|s| render(s, payload))
                .unwrap_or_else(|| default_body(row, payload)),
        ),
        body_html: row.body_html.as_deref().map(|s| render(s, payload)),
        message_stream: payload
            .get("message_stream")
            .and_then(Value::as_str)
            .map(str::to_string),
        message_id: payload
            .get("message_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

async fn dispatch_row(
    db: &Database,
    senders: &SenderRegistry,
    row: &courier_core::OutboxRow,
) -> Result<RowOutcome, CourierError> {
    let payload = payload_value(row);
    let message_id = payload
        .get("message_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tenant = tenants::get_tenant(db, &row.tenant_id).await?;
    let attempt = match prepare(senders, row, tenant.as_ref()) {
        Ok((sender, tenant)) => {
            let request = build_request(row, &payload);
            sender.send(tenant, &request).await
        }
        Err(reason) => Err(reason),
    };

    match attempt {
        Ok(receipt) => {
            outbox::mark_sent(db, row.id).await?;
            if let Some(id) = message_id {
                messages::patch_status(db, &id, MessageStatus::Sent, receipt.provider_message_id)
                    .await?;
            }
            info!(outbox_id = row.id, channel = %row.channel, "outbox row sent");
            Ok(RowOutcome::Sent)
        }
        Err(e) => {
            let reason = e.to_string();
            let status =
                outbox::mark_failed(db, row.id, &reason, backoff_secs(row.attempt_count)).await?;
            match status {
                OutboxStatus::Dead => {
                    error!(
                        outbox_id = row.id,
                        channel = %row.channel,
                        attempts = row.attempt_count + 1,
                        reason,
                        "outbox row exhausted retries"
                    );
                    if let Some(id) = message_id {
                        messages::patch_status(db, &id, MessageStatus::Failed, None).await?;
                    }
                }
                _ => {
                    warn!(
                        outbox_id = row.id,
                        channel = %row.channel,
                        attempts = row.attempt_count + 1,
                        reason,
                        "outbox row failed, will retry"
                    );
                }
            }
            Ok(RowOutcome::Failed)
        }
    }
}

fn prepare<'a>(
    senders: &'a SenderRegistry,
    row: &courier_core::OutboxRow,
    tenant: Option<&'a Tenant>,
) -> Result<(&'a std::sync::Arc<dyn courier_core::NotifySender>, &'a Tenant), CourierError> {
    let tenant =
        tenant.ok_or_else(|| CourierError::NotFound(format!("tenant {}", row.tenant_id)))?;
    let sender = senders.get(row.channel).ok_or_else(|| {
        CourierError::Internal(format!("no sender registered for channel {}", row.channel))
    })?;
    Ok((sender, tenant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::tempdir;
    use uuid::Uuid;

    use courier_core::{Channel, Direction, Message, NotifySender, ProviderReceipt};
    use courier_storage::queries::{contacts, conversations, outbox};
    use courier_storage::NewOutboxRow;

    struct StubSender {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubSender {
        fn ok() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
        }
    }

    #[async_trait]
    impl NotifySender for StubSender {
        fn name(&self) -> &str {
            "stub"
        }

        async fn send(
            &self,
            _tenant: &Tenant,
            _request: &SendRequest,
        ) -> Result<ProviderReceipt, CourierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(CourierError::Provider {
                    message: "451 try later".into(),
                    source: None,
                })
            } else {
                Ok(ProviderReceipt {
                    provider_message_id: Some("prov-1".into()),
                })
            }
        }
    }

    async fn setup() -> (Database, tempfile::TempDir, Tenant) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let tenant = Tenant {
            id: "t-1".into(),
            name: "Tenant".into(),
            email_from_address: Some("hello@mg.t-1.test".into()),
            email_api_key: Some("key".into()),
            email_route_secret: Some("secret".into()),
            sms_from_number: Some("+15550100001".into()),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        tenants::create_tenant(&db, &tenant).await.unwrap();
        (db, dir, tenant)
    }

    fn registry(sender: Arc<StubSender>) -> SenderRegistry {
        let mut registry = SenderRegistry::new();
        registry.register(Channel::Email, sender);
        registry
    }

    async fn enqueue_row(
        db: &Database,
        tenant: &Tenant,
        payload: Option<String>,
        max_attempts: i64,
    ) -> i64 {
        outbox::enqueue(
            db,
            &NewOutboxRow {
                tenant_id: tenant.id.clone(),
                channel: Channel::Email,
                event_key: "order.created".into(),
                to_address: "kim@example.com".into(),
                subject: Some("Order {{order.id}}".into()),
                body_text: Some("Thanks {{name}}!".into()),
                body_html: None,
                payload,
                max_attempts,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn successful_send_settles_the_row() {
        let (db, _dir, tenant) = setup().await;
        let sender = StubSender::ok();
        let id = enqueue_row(&db, &tenant, None, 5).await;

        let report = run_dispatch(&db, &registry(sender.clone()), 10).await.unwrap();
        assert_eq!(report, DispatchReport { claimed: 1, sent: 1, failed: 0 });
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);

        let row = outbox::get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Sent);
        assert!(row.last_error.is_none());
    }

    #[tokio::test]
    async fn failure_requeues_with_backoff_then_dies() {
        let (db, _dir, tenant) = setup().await;
        let sender = StubSender::failing();
        let id = enqueue_row(&db, &tenant, None, 2).await;

        let report = run_dispatch(&db, &registry(sender.clone()), 10).await.unwrap();
        assert_eq!(report.failed, 1);
        let row = outbox::get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Pending);
        assert_eq!(row.attempt_count, 1);
        assert!(row.last_error.as_deref().unwrap().contains("451"));
        // Pushed into the future; the next run must not claim it.
        let report = run_dispatch(&db, &registry(sender.clone()), 10).await.unwrap();
        assert_eq!(report.claimed, 0);

        // Pull next_attempt_at back to due and exhaust the final attempt.
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE outbox SET next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ','now','-1 minutes')
                     WHERE id = ?1",
                    [id],
                )
            })
            .await
            .unwrap();
        let report = run_dispatch(&db, &registry(sender.clone()), 10).await.unwrap();
        assert_eq!(report.failed, 1);
        let row = outbox::get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Dead);
        assert_eq!(row.attempt_count, 2);
    }

    #[tokio::test]
    async fn correlated_message_is_patched_on_send() {
        let (db, _dir, tenant) = setup().await;
        let contact = contacts::upsert_by_email(&db, &tenant.id, "kim@example.com", "Kim")
            .await
            .unwrap();
        let conversation =
            conversations::find_or_create(&db, &tenant.id, &contact.id, Channel::Email, "Hi")
                .await
                .unwrap();
        let message = Message {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.id.clone(),
            conversation_id: conversation.id.clone(),
            contact_id: contact.id.clone(),
            direction: Direction::Outbound,
            channel: Channel::Email,
            provider: None,
            provider_message_id: None,
            status: MessageStatus::Queued,
            subject: Some("Hi".into()),
            body_text: "body".into(),
            body_html: None,
            from_address: "hello@mg.t-1.test".into(),
            to_address: "kim@example.com".into(),
            metadata: None,
            created_at: String::new(),
            sent_at: None,
            delivered_at: None,
            failed_at: None,
            received_at: None,
        };
        messages::insert_message(&db, &message).await.unwrap();
        let payload = serde_json::json!({ "message_id": message.id }).to_string();
        enqueue_row(&db, &tenant, Some(payload), 5).await;

        run_dispatch(&db, &registry(StubSender::ok()), 10).await.unwrap();

        let loaded = messages::get_message(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, MessageStatus::Sent);
        assert_eq!(loaded.provider_message_id.as_deref(), Some("prov-1"));
        assert!(loaded.sent_at.is_some());
    }

    #[tokio::test]
    async fn unroutable_channel_counts_as_failure() {
        let (db, _dir, tenant) = setup().await;
        let id = enqueue_row(&db, &tenant, None, 5).await;
        // Registry without an email sender.
        let report = run_dispatch(&db, &SenderRegistry::new(), 10).await.unwrap();
        assert_eq!(report.failed, 1);
        let row = outbox::get_row(&db, id).await.unwrap().unwrap();
        assert_eq!(row.status, OutboxStatus::Pending);
        assert!(row.last_error.as_deref().unwrap().contains("no sender registered"));
    }

    #[test]
    fn rows_without_a_body_fall_back_to_the_default_template() {
        let row = courier_core::OutboxRow {
            id: 1,
            tenant_id: "t-1".into(),
            channel: Channel::Email,
            event_key: "order.created".into(),
            to_address: "kim@example.com".into(),
            subject: None,
            body_text: None,
            body_html: None,
            payload: None,
            status: OutboxStatus::Pending,
            attempt_count: 0,
            max_attempts: 5,
            next_attempt_at: String::new(),
            last_error: None,
            locked_until: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let payload = serde_json::json!({ "start_at": "2026-09-01T10:00:00Z" });
        let request = build_request(&row, &payload);
        assert_eq!(
            request.body_text.as_deref(),
            Some("Event order.created for 2026-09-01T10:00:00Z")
        );

        // No payload at all still renders, with the unresolved path empty.
        let request = build_request(&row, &Value::Null);
        assert_eq!(request.body_text.as_deref(), Some("Event order.created for "));
    }
}
