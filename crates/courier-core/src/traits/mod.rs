// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.

pub mod sender;

pub use sender::{NoopSender, NotifySender, SenderRegistry};
