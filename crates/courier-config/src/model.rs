// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Courier delivery core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup instead of silently ignoring them.

use serde::{Deserialize, Serialize};

/// Top-level Courier configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with `COURIER_*`
/// environment variable overrides. All sections default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CourierConfig {
    /// Gateway HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Inbound webhook verification settings.
    #[serde(default)]
    pub webhooks: WebhookConfig,

    /// Outbound policy fallback defaults.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Email provider adapter settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// SMS provider adapter settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// Outbox dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Gateway HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for inbound email attachment blobs.
    #[serde(default = "default_attachments_dir")]
    pub attachments_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            attachments_dir: default_attachments_dir(),
        }
    }
}

fn default_database_path() -> String {
    "courier.db".to_string()
}

fn default_attachments_dir() -> String {
    "attachments".to_string()
}

/// Inbound webhook verification configuration.
///
/// `verify_signatures` exists so local development can run without provider
/// secrets. When verification is on and the relevant secret is missing, the
/// gateway treats the request as a fatal misconfiguration (500), never as a
/// silent pass.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Master toggle for webhook signature verification.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,

    /// Email provider webhook signing key.
    #[serde(default)]
    pub email_signing_key: Option<String>,

    /// SMS provider auth token used for request signing.
    #[serde(default)]
    pub sms_auth_token: Option<String>,

    /// Maximum allowed clock skew for signed email webhook timestamps.
    #[serde(default = "default_max_skew_secs")]
    pub max_skew_secs: i64,

    /// Shared secret for the internal dispatch trigger endpoint.
    #[serde(default)]
    pub internal_dispatch_secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            verify_signatures: default_verify_signatures(),
            email_signing_key: None,
            sms_auth_token: None,
            max_skew_secs: default_max_skew_secs(),
            internal_dispatch_secret: None,
        }
    }
}

fn default_verify_signatures() -> bool {
    true
}

fn default_max_skew_secs() -> i64 {
    900
}

/// Outbound policy fallback defaults, used when a tenant has no settings row
/// or leaves a field unset. The policy engine never fails open on missing
/// configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Max outbound messages per contact per channel per trailing hour.
    #[serde(default = "default_hourly_cap")]
    pub default_hourly_cap: i64,

    /// Max outbound messages per contact per channel per trailing 24h.
    #[serde(default = "default_daily_cap")]
    pub default_daily_cap: i64,

    /// Dedupe suppression window in minutes.
    #[serde(default = "default_dedupe_minutes")]
    pub default_dedupe_minutes: i64,

    /// IANA timezone used when a tenant has none configured.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_hourly_cap: default_hourly_cap(),
            default_daily_cap: default_daily_cap(),
            default_dedupe_minutes: default_dedupe_minutes(),
            default_timezone: default_timezone(),
        }
    }
}

fn default_hourly_cap() -> i64 {
    2
}

fn default_daily_cap() -> i64 {
    6
}

fn default_dedupe_minutes() -> i64 {
    30
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

/// Email provider adapter configuration. Per-tenant API keys and
/// from-addresses live on the tenant row; this section carries the
/// provider-global pieces.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Provider API base URL. Overridable for tests.
    #[serde(default = "default_email_base_url")]
    pub base_url: String,

    /// Sending domain appended to the base URL path.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            base_url: default_email_base_url(),
            domain: None,
        }
    }
}

fn default_email_base_url() -> String {
    "https://api.mailgun.net/v3".to_string()
}

/// SMS provider adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Provider API base URL. Overridable for tests.
    #[serde(default = "default_sms_base_url")]
    pub base_url: String,

    /// Provider account SID (Basic auth username).
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Provider auth token (Basic auth password).
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_sms_base_url(),
            account_sid: None,
            auth_token: None,
        }
    }
}

fn default_sms_base_url() -> String {
    "https://api.twilio.com".to_string()
}

/// Outbox dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Max rows claimed per dispatch invocation.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: i64,

    /// Default max delivery attempts before a row goes dead.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Per-request timeout for provider HTTP calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_limit: default_batch_limit(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_batch_limit() -> i64 {
    25
}

fn default_max_attempts() -> i64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    15
}
