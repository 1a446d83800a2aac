// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Courier workspace.
//!
//! Timestamps are ISO-8601 text (`%Y-%m-%dT%H:%M:%fZ`), matching what the
//! storage layer writes via SQLite `strftime`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Delivery medium for a message or notification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    /// Reserved placeholder; dispatching to it is a no-op.
    InApp,
}

/// Direction of a conversational message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Message lifecycle status.
///
/// Outbound messages move `queued -> sent -> delivered` or `queued -> failed`,
/// with delivered/failed terminal. Inbound messages are created directly in
/// `received`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Received,
}

/// Outbox row lifecycle status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Dead,
}

/// Per-channel consent state for a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    OptedIn,
    OptedOut,
}

/// A tenant of the platform, with per-tenant provider credentials and
/// inbound routing identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// From-address for outbound email, e.g. `"Acme <hello@mg.acme.com>"`.
    pub email_from_address: Option<String>,
    /// Per-tenant email provider API key (Basic auth password).
    pub email_api_key: Option<String>,
    /// Opaque secret embedded in the inbound-mail webhook path.
    pub email_route_secret: Option<String>,
    /// E.164 number owned by the tenant; maps inbound SMS `To` to the tenant.
    pub sms_from_number: Option<String>,
    pub created_at: String,
}

/// Tenant policy settings. Any `None` field falls back to the configured
/// workspace default; a missing row entirely falls back to all defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantSettings {
    pub tenant_id: String,
    pub timezone: Option<String>,
    pub quiet_hours_enabled: bool,
    /// Quiet window start, `HH:MM` 24-hour.
    pub quiet_start: Option<String>,
    /// Quiet window end, `HH:MM` 24-hour.
    pub quiet_end: Option<String>,
    pub hourly_cap: Option<i64>,
    pub daily_cap: Option<i64>,
    pub dedupe_minutes: Option<i64>,
}

/// Tenant-scoped identity keyed by normalized email or E.164 phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub tenant_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: String,
    pub status: String,
    /// Free-form JSON metadata.
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A thread scoping one channel between one contact and the tenant.
/// The channel is immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub contact_id: String,
    pub channel: Channel,
    pub subject: Option<String>,
    pub status: String,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A single inbound or outbound communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub tenant_id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub direction: Direction,
    pub channel: Channel,
    pub provider: Option<String>,
    /// Provider-assigned id, set once the provider accepts the message.
    pub provider_message_id: Option<String>,
    pub status: MessageStatus,
    pub subject: Option<String>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub from_address: String,
    pub to_address: String,
    /// JSON metadata carrying correlation keys, dedupe keys, opt-out flags.
    pub metadata: Option<String>,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub failed_at: Option<String>,
    pub received_at: Option<String>,
}

/// Append-only audit record, one per provider webhook event received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: i64,
    pub message_id: String,
    pub provider: String,
    pub event_type: String,
    /// Raw provider payload, JSON text.
    pub payload: String,
    pub created_at: String,
}

/// Metadata for an inbound email attachment. `storage_key` is `None` when
/// the upload failed; the failure is recorded in `metadata` instead of
/// blocking message creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub id: String,
    pub message_id: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub storage_key: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// Per (tenant, contact, channel) consent record. Upserted, never appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPreference {
    pub tenant_id: String,
    pub contact_id: String,
    pub channel: Channel,
    pub consent_status: ConsentStatus,
    pub consent_source: String,
    pub updated_at: String,
}

/// A durable notification send request, drained by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxRow {
    pub id: i64,
    pub tenant_id: String,
    pub channel: Channel,
    /// Internal event that produced this row, e.g. `order.created`.
    pub event_key: String,
    pub to_address: String,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    /// JSON payload for template rendering.
    pub payload: Option<String>,
    pub status: OutboxStatus,
    pub attempt_count: i64,
    pub max_attempts: i64,
    pub next_attempt_at: String,
    pub last_error: Option<String>,
    /// Lease expiry while a dispatcher holds the row in `sending`.
    pub locked_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A normalized send request handed to a provider adapter. Per-tenant
/// credentials are resolved from the accompanying [`Tenant`].
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub channel: Channel,
    pub to_address: String,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    /// Optional provider message-stream tag for transactional email.
    pub message_stream: Option<String>,
    /// Our message id, attached as a provider user-variable so delivery
    /// events can be correlated back.
    pub message_id: Option<String>,
}

/// What a provider adapter reports back on a successful send.
#[derive(Debug, Clone, Default)]
pub struct ProviderReceipt {
    pub provider_message_id: Option<String>,
}
