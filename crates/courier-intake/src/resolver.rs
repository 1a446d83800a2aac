// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact and conversation resolution for inbound messages.
//!
//! Idempotently maps a sender identity to exactly one contact and one active
//! conversation, creating either when absent. There is no compensating
//! rollback across the contact -> conversation -> message steps: a failure
//! after contact creation leaves a contact that the retry reuses.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use courier_core::{
    Channel, Contact, Conversation, CourierError, Direction, Message, MessageStatus, Tenant,
};
use courier_storage::queries::{contacts, conversations, messages};
use courier_storage::Database;

use crate::normalize;

/// An inbound email as extracted from the inbound-mail webhook.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    pub from: String,
    pub recipient: String,
    pub subject: Option<String>,
    pub body_text: String,
    pub body_html: Option<String>,
    /// The provider's `Message-Id` header value.
    pub provider_message_id: Option<String>,
}

/// An inbound SMS as extracted from the SMS webhook.
#[derive(Debug, Clone)]
pub struct InboundSms {
    pub from: String,
    pub to: String,
    pub body: String,
    pub provider_sid: Option<String>,
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Resolve (or create) the contact for a normalized email sender.
async fn resolve_email_contact(
    db: &Database,
    tenant_id: &str,
    raw_from: &str,
) -> Result<Contact, CourierError> {
    let email = normalize::normalize_email(raw_from).ok_or_else(|| {
        CourierError::Validation(format!("unparseable sender address `{raw_from}`"))
    })?;
    // The raw identity doubles as the default display name.
    contacts::upsert_by_email(db, tenant_id, &email, &email).await
}

/// Resolve (or create) the contact for a normalized SMS sender.
async fn resolve_sms_contact(
    db: &Database,
    tenant_id: &str,
    raw_from: &str,
) -> Result<Contact, CourierError> {
    let phone = normalize::normalize_phone(raw_from).ok_or_else(|| {
        CourierError::Validation(format!("unparseable sender number `{raw_from}`"))
    })?;
    contacts::upsert_by_phone(db, tenant_id, &phone, &phone).await
}

/// Record an inbound email: contact, conversation, and a message row in
/// terminal `received` status. Returns the stored message.
pub async fn record_inbound_email(
    db: &Database,
    tenant: &Tenant,
    inbound: &InboundEmail,
) -> Result<(Message, Contact, Conversation), CourierError> {
    let contact = resolve_email_contact(db, &tenant.id, &inbound.from).await?;

    let subject = inbound
        .subject
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Email with {}",
                contact.email.as_deref().unwrap_or(&inbound.from)
            )
        });
    let conversation =
        conversations::find_or_create(db, &tenant.id, &contact.id, Channel::Email, &subject)
            .await?;

    let message = Message {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        conversation_id: conversation.id.clone(),
        contact_id: contact.id.clone(),
        direction: Direction::Inbound,
        channel: Channel::Email,
        provider: Some("mailgun".to_string()),
        provider_message_id: inbound.provider_message_id.clone(),
        status: MessageStatus::Received,
        subject: inbound.subject.clone(),
        body_text: inbound.body_text.clone(),
        body_html: inbound.body_html.clone(),
        from_address: contact.email.clone().unwrap_or_else(|| inbound.from.clone()),
        to_address: inbound.recipient.clone(),
        metadata: None,
        created_at: String::new(),
        sent_at: None,
        delivered_at: None,
        failed_at: None,
        received_at: Some(now_iso()),
    };
    messages::insert_message(db, &message).await?;
    conversations::touch(db, &conversation.id).await?;

    info!(
        tenant_id = %tenant.id,
        contact_id = %contact.id,
        conversation_id = %conversation.id,
        message_id = %message.id,
        "inbound email recorded"
    );
    Ok((message, contact, conversation))
}

/// Record an inbound SMS the same way.
pub async fn record_inbound_sms(
    db: &Database,
    tenant: &Tenant,
    inbound: &InboundSms,
) -> Result<(Message, Contact, Conversation), CourierError> {
    let contact = resolve_sms_contact(db, &tenant.id, &inbound.from).await?;

    let subject = format!(
        "SMS with {}",
        contact.phone.as_deref().unwrap_or(&inbound.from)
    );
    let conversation =
        conversations::find_or_create(db, &tenant.id, &contact.id, Channel::Sms, &subject).await?;

    let message = Message {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant.id.clone(),
        conversation_id: conversation.id.clone(),
        contact_id: contact.id.clone(),
        direction: Direction::Inbound,
        channel: Channel::Sms,
        provider: Some("twilio".to_string()),
        provider_message_id: inbound.provider_sid.clone(),
        status: MessageStatus::Received,
        subject: None,
        body_text: inbound.body.clone(),
        body_html: None,
        from_address: contact.phone.clone().unwrap_or_else(|| inbound.from.clone()),
        to_address: inbound.to.clone(),
        metadata: None,
        created_at: String::new(),
        sent_at: None,
        delivered_at: None,
        failed_at: None,
        received_at: Some(now_iso()),
    };
    messages::insert_message(db, &message).await?;
    conversations::touch(db, &conversation.id).await?;

    debug!(
        tenant_id = %tenant.id,
        contact_id = %contact.id,
        message_id = %message.id,
        "inbound sms recorded"
    );
    Ok((message, contact, conversation))
}
