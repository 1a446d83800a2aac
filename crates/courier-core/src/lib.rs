// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Courier delivery core.
//!
//! This crate provides the shared error type, domain row types, channel and
//! status enums, and the provider-sender adapter trait used throughout the
//! Courier workspace.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CourierError;
pub use traits::{NoopSender, NotifySender, SenderRegistry};
pub use types::{
    Channel, ChannelPreference, ConsentStatus, Contact, Conversation, Direction, Message,
    MessageAttachment, MessageEvent, MessageStatus, OutboxRow, OutboxStatus, ProviderReceipt,
    SendRequest, Tenant, TenantSettings,
};
