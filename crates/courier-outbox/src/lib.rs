// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox dispatch for the Courier delivery core.
//!
//! The `dispatcher` module claims due outbox rows and drives them through
//! provider adapters; `render` fills message templates from row payloads;
//! `backoff` computes the retry schedule.

pub mod backoff;
pub mod dispatcher;
pub mod render;

pub use dispatcher::{run_dispatch, DispatchReport};
