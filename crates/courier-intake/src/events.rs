// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider delivery-event application and opt-out handling.
//!
//! Every webhook event that correlates to a message appends one immutable
//! MessageEvent row; recognized event names additionally patch the message
//! status. Unroutable events are reported as `processed = 0`, never as an
//! error, so the provider's retry machinery does not hammer an endpoint that
//! can never succeed.

use tracing::{info, warn};

use courier_core::{Channel, ConsentStatus, CourierError, MessageStatus};
use courier_storage::queries::{messages, preferences};
use courier_storage::Database;

/// SMS bodies that trigger an opt-out when they match the whole message,
/// case-insensitive. The standard carrier keyword set.
pub const STOP_KEYWORDS: [&str; 6] = ["STOP", "STOPALL", "UNSUBSCRIBE", "CANCEL", "END", "QUIT"];

/// Whole-message, case-insensitive STOP keyword match.
pub fn is_stop_keyword(body: &str) -> bool {
    let trimmed = body.trim();
    STOP_KEYWORDS
        .iter()
        .any(|kw| trimmed.eq_ignore_ascii_case(kw))
}

/// Map an email provider event name onto a message status. `None` means the
/// event is recognized only for the audit trail.
pub fn map_email_event(event: &str) -> Option<MessageStatus> {
    match event {
        "accepted" => Some(MessageStatus::Sent),
        "delivered" => Some(MessageStatus::Delivered),
        "failed" | "rejected" | "bounced" | "complained" => Some(MessageStatus::Failed),
        _ => None,
    }
}

/// Events that also withdraw email consent for the recipient.
fn revokes_email_consent(event: &str) -> bool {
    matches!(event, "unsubscribed" | "complained")
}

/// Outcome of applying one provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// 1 when a message was found and the event recorded, else 0.
    pub processed: usize,
}

/// Apply an email provider delivery event correlated by our message id.
///
/// Unknown ids yield `processed: 0`. Known ids always gain a MessageEvent
/// row; recognized event names patch status (monotonically), and
/// consent-revoking events upsert an email opt-out for the message's
/// contact.
pub async fn apply_email_event(
    db: &Database,
    message_id: &str,
    event: &str,
    raw_payload: &str,
) -> Result<EventOutcome, CourierError> {
    let Some(message) = messages::get_message(db, message_id).await? else {
        warn!(message_id, event, "email event for unknown message -- skipping");
        return Ok(EventOutcome { processed: 0 });
    };

    messages::insert_event(db, &message.id, "mailgun", event, raw_payload).await?;

    if let Some(status) = map_email_event(event) {
        let updated = messages::patch_status(db, &message.id, status, None).await?;
        info!(
            message_id = %message.id,
            event,
            status = %status,
            updated,
            "email delivery event applied"
        );
    } else {
        info!(message_id = %message.id, event, "unrecognized email event recorded");
    }

    if revokes_email_consent(event) {
        preferences::upsert_preference(
            db,
            &message.tenant_id,
            &message.contact_id,
            Channel::Email,
            ConsentStatus::OptedOut,
            &format!("email_{event}"),
        )
        .await?;
        info!(
            tenant_id = %message.tenant_id,
            contact_id = %message.contact_id,
            event,
            "email consent revoked"
        );
    }

    Ok(EventOutcome { processed: 1 })
}

/// Record an SMS opt-out triggered by a STOP keyword.
pub async fn apply_sms_opt_out(
    db: &Database,
    tenant_id: &str,
    contact_id: &str,
) -> Result<(), CourierError> {
    preferences::upsert_preference(
        db,
        tenant_id,
        contact_id,
        Channel::Sms,
        ConsentStatus::OptedOut,
        "sms_stop",
    )
    .await?;
    info!(tenant_id, contact_id, "sms opt-out recorded");
    Ok(())
}
