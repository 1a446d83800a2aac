// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Courier delivery core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed query modules for
//! tenants, contacts, conversations, messages, consent preferences, and the
//! notification outbox.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use queries::outbox::NewOutboxRow;
