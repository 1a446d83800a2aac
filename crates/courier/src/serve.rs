// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Opens the store, wires provider adapters into the sender registry, and
//! runs the webhook server until the process is stopped.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use courier_config::model::CourierConfig;
use courier_core::{Channel, CourierError, NoopSender, SenderRegistry};
use courier_email::EmailSender;
use courier_gateway::AppState;
use courier_sms::SmsSender;
use courier_storage::Database;

/// Build the channel routing table from configuration. A channel whose
/// provider credentials are absent stays unregistered; dispatch for it fails
/// per-row instead of at startup.
fn build_senders(config: &CourierConfig) -> Result<SenderRegistry, CourierError> {
    let timeout = Duration::from_secs(config.dispatch.request_timeout_secs);
    let mut senders = SenderRegistry::new();

    senders.register(Channel::Email, Arc::new(EmailSender::new(&config.email, timeout)?));
    match SmsSender::new(&config.sms, timeout) {
        Ok(sender) => senders.register(Channel::Sms, Arc::new(sender)),
        Err(e) => warn!(error = %e, "sms channel disabled"),
    }
    senders.register(Channel::InApp, Arc::new(NoopSender));

    for (channel, adapter) in senders.entries() {
        info!(%channel, adapter, "sender registered");
    }
    Ok(senders)
}

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.server.log_level);

    let db = Database::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "store opened");

    let senders = build_senders(&config)?;
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(db, config, senders);

    courier_gateway::start_server(&host, port, state).await
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
