// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS provider webhook (form-encoded).
//!
//! The provider signs the exact public URL it posted to; behind a reverse
//! proxy that URL is reconstructed from `X-Forwarded-Proto` and
//! `X-Forwarded-Host` plus the original path and query.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::{Form, Json};
use serde::Serialize;
use tracing::info;

use courier_config::model::WebhookConfig;
use courier_core::CourierError;
use courier_intake::events::{apply_sms_opt_out, is_stop_keyword};
use courier_intake::resolver::{record_inbound_sms, InboundSms};
use courier_storage::queries::tenants;
use courier_verify::sms::verify_sms_signature;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SmsAck {
    pub ok: bool,
    pub message_id: String,
    pub opted_out: bool,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The URL the provider signed, as seen from outside any reverse proxy.
fn public_url(headers: &HeaderMap, uri: &Uri) -> String {
    let proto = header(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header(headers, "x-forwarded-host")
        .or_else(|| header(headers, "host"))
        .unwrap_or("localhost");
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{proto}://{host}{path_and_query}")
}

fn verify_signature(
    config: &WebhookConfig,
    headers: &HeaderMap,
    uri: &Uri,
    params: &BTreeMap<String, String>,
) -> Result<(), CourierError> {
    if !config.verify_signatures {
        return Ok(());
    }
    let auth_token = config
        .sms_auth_token
        .as_deref()
        .ok_or_else(|| CourierError::Config("webhooks.sms_auth_token is not set".to_string()))?;
    let signature = header(headers, "x-twilio-signature").ok_or_else(|| {
        CourierError::InvalidSignature("missing X-Twilio-Signature header".to_string())
    })?;
    verify_sms_signature(auth_token, &public_url(headers, uri), params, signature)
}

/// POST /webhooks/sms
///
/// Records an inbound SMS for the tenant owning the `To` number. A
/// whole-body STOP keyword additionally opts the sender out of the channel.
pub async fn post_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Form(params): Form<BTreeMap<String, String>>,
) -> Result<Json<SmsAck>, ApiError> {
    verify_signature(&state.config.webhooks, &headers, &uri, &params)?;

    let to = params.get("To").cloned().unwrap_or_default();
    let tenant = tenants::find_by_sms_number(&state.db, &to)
        .await?
        .ok_or_else(|| CourierError::NotFound(format!("no tenant mapped to number {to}")))?;

    let inbound = InboundSms {
        from: params.get("From").cloned().unwrap_or_default(),
        to,
        body: params.get("Body").cloned().unwrap_or_default(),
        provider_sid: params
            .get("MessageSid")
            .or_else(|| params.get("SmsSid"))
            .cloned(),
    };
    let (message, contact, _conversation) =
        record_inbound_sms(&state.db, &tenant, &inbound).await?;

    let opted_out = is_stop_keyword(&inbound.body);
    if opted_out {
        apply_sms_opt_out(&state.db, &tenant.id, &contact.id).await?;
        info!(tenant_id = %tenant.id, contact_id = %contact.id, "stop keyword processed");
    }

    Ok(Json(SmsAck {
        ok: true,
        message_id: message.id,
        opted_out,
    }))
}
