// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The provider-sender adapter trait and its registry.
//!
//! Each channel routes to one named [`NotifySender`]. Optional channels
//! register the [`NoopSender`] so dispatch stays total over every channel
//! without special-casing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::{Channel, ProviderReceipt, SendRequest, Tenant};

/// Translates a normalized send request into a provider-specific call.
///
/// Implementations are side-effect-only; they hold no local state beyond an
/// HTTP client and static credentials. Errors must surface the raw provider
/// response text for diagnosability.
#[async_trait]
pub trait NotifySender: Send + Sync {
    /// Adapter name for logging and registry listings.
    fn name(&self) -> &str;

    /// Send one message on behalf of `tenant`. Non-2xx provider responses
    /// and timeouts are errors; both feed the dispatcher's retry path.
    async fn send(
        &self,
        tenant: &Tenant,
        request: &SendRequest,
    ) -> Result<ProviderReceipt, CourierError>;
}

/// Channel-to-sender routing table.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Channel, Arc<dyn NotifySender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Channel, sender: Arc<dyn NotifySender>) {
        self.senders.insert(channel, sender);
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn NotifySender>> {
        self.senders.get(&channel)
    }

    /// Registered (channel, adapter-name) pairs, for startup logging.
    pub fn entries(&self) -> Vec<(Channel, String)> {
        self.senders
            .iter()
            .map(|(c, s)| (*c, s.name().to_string()))
            .collect()
    }
}

/// A sender that accepts everything and sends nothing. Registered for
/// channels without a wired provider (`in_app`).
pub struct NoopSender;

#[async_trait]
impl NotifySender for NoopSender {
    fn name(&self) -> &str {
        "noop"
    }

    async fn send(
        &self,
        _tenant: &Tenant,
        _request: &SendRequest,
    ) -> Result<ProviderReceipt, CourierError> {
        Ok(ProviderReceipt::default())
    }
}
