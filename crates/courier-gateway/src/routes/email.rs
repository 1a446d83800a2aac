// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email provider webhooks: delivery events (JSON) and inbound mail
//! (multipart).

use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use courier_config::model::WebhookConfig;
use courier_core::{CourierError, MessageAttachment};
use courier_intake::events::apply_email_event;
use courier_intake::resolver::{record_inbound_email, InboundEmail};
use courier_storage::queries::{messages, tenants};
use courier_verify::email::{check_freshness, verify_email_signature, EmailSignature};

use crate::error::ApiError;
use crate::state::AppState;

/// Acknowledgement for the events webhook. `processed` is 0 when the event
/// could not be correlated to a message.
#[derive(Debug, Serialize)]
pub struct EventAck {
    pub ok: bool,
    pub processed: usize,
}

/// Acknowledgement for the inbound-mail webhook.
#[derive(Debug, Serialize)]
pub struct InboundAck {
    pub ok: bool,
    pub message_id: String,
    pub attachments: usize,
}

/// Signature fields may arrive as JSON strings or numbers (the timestamp in
/// particular).
fn signature_field(container: &Value, key: &str) -> Result<String, CourierError> {
    match container.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(CourierError::InvalidSignature(format!(
            "missing signature field `{key}`"
        ))),
    }
}

fn verify_event_signature(config: &WebhookConfig, body: &Value) -> Result<(), CourierError> {
    if !config.verify_signatures {
        return Ok(());
    }
    let key = config.email_signing_key.as_deref().ok_or_else(|| {
        CourierError::Config("webhooks.email_signing_key is not set".to_string())
    })?;
    let container = body
        .get("signature")
        .ok_or_else(|| CourierError::InvalidSignature("missing signature object".to_string()))?;
    let sig = EmailSignature {
        timestamp: signature_field(container, "timestamp")?,
        token: signature_field(container, "token")?,
        signature: signature_field(container, "signature")?,
    };
    check_freshness(&sig.timestamp, Utc::now().timestamp(), config.max_skew_secs)?;
    verify_email_signature(key, &sig)
}

/// POST /webhooks/email/events
///
/// Applies a provider delivery event. Events that carry no correlation id
/// are acknowledged with `processed: 0` so the provider does not retry what
/// can never route.
pub async fn post_email_events(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<EventAck>, ApiError> {
    verify_event_signature(&state.config.webhooks, &body)?;

    let event_data = body.get("event-data").cloned().unwrap_or(Value::Null);
    let event = event_data
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let Some(message_id) = event_data
        .pointer("/user-variables/nc_message_id")
        .and_then(Value::as_str)
    else {
        info!(event, "email event without correlation id acknowledged");
        return Ok(Json(EventAck { ok: true, processed: 0 }));
    };

    let outcome =
        apply_email_event(&state.db, message_id, &event, &event_data.to_string()).await?;
    Ok(Json(EventAck {
        ok: true,
        processed: outcome.processed,
    }))
}

struct IncomingAttachment {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> CourierError {
    CourierError::Validation(format!("malformed multipart body: {e}"))
}

fn verify_inbound_signature(
    config: &WebhookConfig,
    fields: &HashMap<String, String>,
) -> Result<(), CourierError> {
    if !config.verify_signatures {
        return Ok(());
    }
    let key = config.email_signing_key.as_deref().ok_or_else(|| {
        CourierError::Config("webhooks.email_signing_key is not set".to_string())
    })?;
    let field = |k: &str| {
        fields.get(k).cloned().ok_or_else(|| {
            CourierError::InvalidSignature(format!("missing signature field `{k}`"))
        })
    };
    let sig = EmailSignature {
        timestamp: field("timestamp")?,
        token: field("token")?,
        signature: field("signature")?,
    };
    check_freshness(&sig.timestamp, Utc::now().timestamp(), config.max_skew_secs)?;
    verify_email_signature(key, &sig)
}

/// Write one attachment blob and record its row. A storage failure is
/// captured in the attachment metadata; it never fails the webhook.
async fn store_attachment(
    state: &AppState,
    message_id: &str,
    incoming: &IncomingAttachment,
) -> Result<(), CourierError> {
    let id = Uuid::new_v4().to_string();
    let dir = FsPath::new(&state.config.storage.attachments_dir);
    let write = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&id), &incoming.bytes).await?;
        std::io::Result::Ok(())
    };
    let (storage_key, metadata) = match write.await {
        Ok(()) => (Some(dir.join(&id).to_string_lossy().into_owned()), None),
        Err(e) => {
            warn!(message_id, filename = %incoming.filename, error = %e, "attachment store failed");
            (None, Some(json!({ "error": e.to_string() }).to_string()))
        }
    };
    messages::insert_attachment(
        &state.db,
        &MessageAttachment {
            id,
            message_id: message_id.to_string(),
            filename: incoming.filename.clone(),
            content_type: incoming.content_type.clone(),
            byte_size: incoming.bytes.len() as i64,
            storage_key,
            metadata,
            created_at: String::new(),
        },
    )
    .await
}

/// POST /webhooks/email/inbound/{route_secret}
///
/// Receives a parsed inbound email as multipart form data. The path secret
/// selects the tenant; an unknown secret is indistinguishable from a bad
/// signature (403).
pub async fn post_email_inbound(
    State(state): State<AppState>,
    Path(route_secret): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<InboundAck>, ApiError> {
    let tenant = tenants::find_by_route_secret(&state.db, &route_secret)
        .await?
        .ok_or_else(|| CourierError::InvalidSignature("unknown inbound route".to_string()))?;

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut attachments: Vec<IncomingAttachment> = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
            attachments.push(IncomingAttachment { filename, content_type, bytes });
        } else {
            fields.insert(name, field.text().await.map_err(multipart_error)?);
        }
    }

    verify_inbound_signature(&state.config.webhooks, &fields)?;

    let first = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|k| fields.get(*k).cloned())
    };
    let from = first(&["from", "sender"]).ok_or_else(|| {
        CourierError::Validation("inbound mail is missing a sender field".to_string())
    })?;
    let recipient = first(&["recipient"]).unwrap_or_default();
    let inbound = InboundEmail {
        from,
        recipient,
        subject: first(&["subject"]).filter(|s| !s.trim().is_empty()),
        body_text: first(&["body-plain", "stripped-text"]).unwrap_or_default(),
        body_html: first(&["body-html", "stripped-html"]),
        provider_message_id: first(&["Message-Id", "message-id"]),
    };
    let (message, _contact, _conversation) =
        record_inbound_email(&state.db, &tenant, &inbound).await?;

    for incoming in &attachments {
        store_attachment(&state, &message.id, incoming).await?;
    }

    Ok(Json(InboundAck {
        ok: true,
        message_id: message.id,
        attachments: attachments.len(),
    }))
}
