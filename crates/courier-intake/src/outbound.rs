// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound submission: the policy gate plus transactional enqueue.
//!
//! An allowed send produces exactly two durable artifacts, a `queued`
//! message row (the conversation-visible record) and a `pending` outbox row
//! (the dispatcher's work item), correlated through the message id carried
//! in the outbox payload. A denied send produces neither.

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use courier_config::model::{DispatchConfig, PolicyConfig};
use courier_core::{
    Channel, Contact, CourierError, Direction, Message, MessageStatus, Tenant,
};
use courier_policy::{evaluate, DenyCode, EffectivePolicy, PolicyDecision, SendIntent};
use courier_storage::queries::{contacts, conversations, messages, outbox, tenants};
use courier_storage::{Database, NewOutboxRow};

/// An outbound send as submitted by a caller inside the tenant boundary.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub channel: Channel,
    pub subject: Option<String>,
    pub body_text: String,
    pub body_html: Option<String>,
    /// Optional suppression key; identical keys within the dedupe window are
    /// dropped by policy.
    pub dedupe_key: Option<String>,
}

/// What became of a submission.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Policy allowed the send; the message is queued and an outbox row
    /// awaits the dispatcher.
    Queued { message: Message, outbox_id: i64 },
    /// Policy denied the send. Nothing was persisted.
    Denied { code: DenyCode, reason: String },
}

fn resolve_addresses(
    tenant: &Tenant,
    contact: &Contact,
    channel: Channel,
) -> Result<(String, String), CourierError> {
    match channel {
        Channel::Email => {
            let to = contact.email.clone().ok_or_else(|| {
                CourierError::Validation(format!("contact {} has no email address", contact.id))
            })?;
            let from = tenant.email_from_address.clone().ok_or_else(|| {
                CourierError::Validation(format!("tenant {} is not provisioned for email", tenant.id))
            })?;
            Ok((from, to))
        }
        Channel::Sms => {
            let to = contact.phone.clone().ok_or_else(|| {
                CourierError::Validation(format!("contact {} has no phone number", contact.id))
            })?;
            let from = tenant.sms_from_number.clone().ok_or_else(|| {
                CourierError::Validation(format!("tenant {} is not provisioned for sms", tenant.id))
            })?;
            Ok((from, to))
        }
        // In-app delivery addresses the contact directly; no provider
        // identity is involved.
        Channel::InApp => Ok((tenant.id.clone(), contact.id.clone())),
    }
}

/// Submit an outbound message. Runs the policy gate against the contact's
/// effective policy, then persists a queued message and a pending outbox row.
pub async fn send_outbound(
    db: &Database,
    policy_defaults: &PolicyConfig,
    dispatch: &DispatchConfig,
    tenant: &Tenant,
    contact_id: &str,
    request: &OutboundRequest,
) -> Result<SendOutcome, CourierError> {
    let contact = contacts::get_contact(db, &tenant.id, contact_id)
        .await?
        .ok_or_else(|| CourierError::NotFound(format!("contact {contact_id}")))?;
    let (from_address, to_address) = resolve_addresses(tenant, &contact, request.channel)?;

    let settings = tenants::get_settings(db, &tenant.id).await?;
    let policy = EffectivePolicy::resolve(settings.as_ref(), policy_defaults);
    let intent = SendIntent {
        tenant_id: &tenant.id,
        contact_id: &contact.id,
        channel: request.channel,
        dedupe_key: request.dedupe_key.as_deref(),
    };
    if let PolicyDecision::Denied { code, reason } =
        evaluate(db, &policy, &intent, Utc::now()).await?
    {
        info!(
            tenant_id = %tenant.id,
            contact_id = %contact.id,
            channel = %request.channel,
            code = %code,
            reason,
            "outbound send denied by policy"
        );
        return Ok(SendOutcome::Denied { code, reason });
    }

    let subject = request
        .subject
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| match request.channel {
            Channel::Email => format!("Email with {to_address}"),
            Channel::Sms => format!("SMS with {to_address}"),
            Channel::InApp => format!("Notification for {}", contact.display_name),
        });
    let conversation =
        conversations::find_or_create(db, &tenant.id, &contact.id, request.channel, &subject)
            .await?;

    let metadata = request
        .dedupe_key
        .as_deref()
        .map(|key| json!({ "dedupe_key": key }).to_string());
    let message = Message {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        conversation_id: conversation.id.clone(),
        contact_id: contact.id.clone(),
        direction: Direction::Outbound,
        channel: request.channel,
        provider: None,
        provider_message_id: None,
        status: MessageStatus::Queued,
        subject: request.subject.clone(),
        body_text: request.body_text.clone(),
        body_html: request.body_html.clone(),
        from_address,
        to_address: to_address.clone(),
        metadata,
        created_at: String::new(),
        sent_at: None,
        delivered_at: None,
        failed_at: None,
        received_at: None,
    };
    messages::insert_message(db, &message).await?;
    conversations::touch(db, &conversation.id).await?;

    let outbox_id = outbox::enqueue(
        db,
        &NewOutboxRow {
            tenant_id: tenant.id.clone(),
            channel: request.channel,
            event_key: format!("message.{}", message.id),
            to_address,
            subject: message.subject.clone(),
            body_text: Some(message.body_text.clone()),
            body_html: message.body_html.clone(),
            payload: Some(
                json!({
                    "message_id": message.id,
                    "contact_id": contact.id,
                    "conversation_id": conversation.id,
                })
                .to_string(),
            ),
            max_attempts: dispatch.max_attempts,
        },
    )
    .await?;

    info!(
        tenant_id = %tenant.id,
        contact_id = %contact.id,
        message_id = %message.id,
        outbox_id,
        channel = %request.channel,
        "outbound send queued"
    );
    Ok(SendOutcome::Queued { message, outbox_id })
}
