// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound intake and outbound submission for the Courier delivery core.
//!
//! Inbound: normalizes sender identities, resolves them to contacts and
//! conversations, persists received messages, and applies provider delivery
//! events (including consent revocation). Outbound: runs the policy gate and
//! enqueues allowed messages onto the notification outbox.

pub mod events;
pub mod normalize;
pub mod outbound;
pub mod resolver;
