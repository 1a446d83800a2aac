// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state for axum request handlers.

use std::sync::Arc;

use courier_config::model::CourierConfig;
use courier_core::SenderRegistry;
use courier_storage::Database;

/// Everything a webhook handler needs: the store, the effective
/// configuration, and the provider routing table.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<CourierConfig>,
    pub senders: Arc<SenderRegistry>,
}

impl AppState {
    pub fn new(db: Database, config: CourierConfig, senders: SenderRegistry) -> Self {
        Self {
            db,
            config: Arc::new(config),
            senders: Arc::new(senders),
        }
    }
}
