// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email provider adapter speaking the Mailgun messages API.
//!
//! Sends are form-encoded POSTs to `{base_url}/{domain}/messages` with HTTP
//! Basic auth (`api` / per-tenant API key). The sending domain comes from
//! configuration, falling back to the domain of the tenant's from-address.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use courier_config::model::EmailConfig;
use courier_core::{CourierError, NotifySender, ProviderReceipt, SendRequest, Tenant};

/// What Mailgun returns for an accepted message.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Mailgun-compatible email sender.
#[derive(Debug, Clone)]
pub struct EmailSender {
    client: reqwest::Client,
    base_url: String,
    domain: Option<String>,
}

impl EmailSender {
    pub fn new(config: &EmailConfig, request_timeout: Duration) -> Result<Self, CourierError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CourierError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            domain: config.domain.clone(),
        })
    }

    /// The sending domain: configured, or taken from the tenant's
    /// from-address (`Name <user@domain>` or bare `user@domain`).
    fn sending_domain(&self, tenant: &Tenant) -> Result<String, CourierError> {
        if let Some(domain) = &self.domain {
            return Ok(domain.clone());
        }
        tenant
            .email_from_address
            .as_deref()
            .and_then(|from| {
                let addr = from
                    .rsplit_once('<')
                    .map(|(_, rest)| rest.trim_end_matches('>'))
                    .unwrap_or(from);
                addr.rsplit_once('@').map(|(_, domain)| domain.trim().to_string())
            })
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                CourierError::Validation(format!(
                    "tenant {} has no usable email sending domain",
                    tenant.id
                ))
            })
    }
}

#[async_trait]
impl NotifySender for EmailSender {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn send(
        &self,
        tenant: &Tenant,
        request: &SendRequest,
    ) -> Result<ProviderReceipt, CourierError> {
        let api_key = tenant.email_api_key.as_deref().ok_or_else(|| {
            CourierError::Validation(format!("tenant {} has no email API key", tenant.id))
        })?;
        let from = tenant.email_from_address.as_deref().ok_or_else(|| {
            CourierError::Validation(format!("tenant {} has no email from-address", tenant.id))
        })?;
        let domain = self.sending_domain(tenant)?;

        let mut form: Vec<(&str, String)> = vec![
            ("from", from.to_string()),
            ("to", request.to_address.clone()),
        ];
        if let Some(subject) = &request.subject {
            form.push(("subject", subject.clone()));
        }
        if let Some(text) = &request.body_text {
            form.push(("text", text.clone()));
        }
        if let Some(html) = &request.body_html {
            form.push(("html", html.clone()));
        }
        if let Some(stream) = &request.message_stream {
            form.push(("o:tag", stream.clone()));
        }
        if let Some(id) = &request.message_id {
            // Echoed back in delivery events for correlation.
            form.push(("v:nc_message_id", id.clone()));
        }

        let url = format!("{}/{domain}/messages", self.base_url);
        debug!(tenant_id = %tenant.id, to = %request.to_address, %url, "sending email");
        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(api_key))
            .form(&form)
            .send()
            .await
            .map_err(|e| CourierError::Provider {
                message: format!("email request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(CourierError::Provider {
                message: format!("email provider returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: SendResponse = serde_json::from_str(&body).unwrap_or(SendResponse { id: None });
        Ok(ProviderReceipt {
            provider_message_id: parsed.id,
        })
    }
}
