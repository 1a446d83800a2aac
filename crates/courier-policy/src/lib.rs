// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send policy engine.
//!
//! Evaluates a prospective send against consent, quiet hours, rate caps, and
//! dedupe in a fixed order, short-circuiting on the first failing check so
//! the reported reason is deterministic even when several would fail.
//!
//! Tenant settings are fetched by the caller and passed in, never read from
//! a process-wide cache, so tests can supply fixed settings directly.

pub mod quiet_hours;

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use strum::Display;
use tracing::debug;

use courier_config::model::PolicyConfig;
use courier_core::{Channel, ConsentStatus, CourierError, TenantSettings};
use courier_storage::queries::{messages, preferences};
use courier_storage::Database;

/// Machine-readable denial codes, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyCode {
    OptedOut,
    QuietHours,
    CapExceeded,
    Deduped,
}

/// The policy verdict. Modeled as a sum type so call sites get
/// exhaustiveness checking instead of a boolean plus nullable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allowed,
    Denied { code: DenyCode, reason: String },
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allowed)
    }

    fn denied(code: DenyCode, reason: impl Into<String>) -> Self {
        PolicyDecision::Denied {
            code,
            reason: reason.into(),
        }
    }
}

/// A prospective outbound send to evaluate.
#[derive(Debug, Clone)]
pub struct SendIntent<'a> {
    pub tenant_id: &'a str,
    pub contact_id: &'a str,
    pub channel: Channel,
    pub dedupe_key: Option<&'a str>,
}

/// Tenant settings merged with configured fallback defaults. Every field is
/// concrete: the engine never fails open because a tenant row is missing.
#[derive(Debug, Clone)]
pub struct EffectivePolicy {
    pub timezone: Tz,
    pub quiet_hours_enabled: bool,
    pub quiet_start: Option<String>,
    pub quiet_end: Option<String>,
    pub hourly_cap: i64,
    pub daily_cap: i64,
    pub dedupe_minutes: i64,
}

impl EffectivePolicy {
    /// Merge an optional tenant settings row over the configured defaults.
    /// An unparseable tenant timezone falls back to the default timezone;
    /// an unparseable default falls back to UTC rather than failing.
    pub fn resolve(settings: Option<&TenantSettings>, defaults: &PolicyConfig) -> Self {
        let default_tz: Tz = defaults
            .default_timezone
            .parse()
            .unwrap_or(chrono_tz::UTC);
        let timezone = settings
            .and_then(|s| s.timezone.as_deref())
            .and_then(|tz| tz.parse().ok())
            .unwrap_or(default_tz);
        Self {
            timezone,
            quiet_hours_enabled: settings.is_some_and(|s| s.quiet_hours_enabled),
            quiet_start: settings.and_then(|s| s.quiet_start.clone()),
            quiet_end: settings.and_then(|s| s.quiet_end.clone()),
            hourly_cap: settings
                .and_then(|s| s.hourly_cap)
                .unwrap_or(defaults.default_hourly_cap),
            daily_cap: settings
                .and_then(|s| s.daily_cap)
                .unwrap_or(defaults.default_daily_cap),
            dedupe_minutes: settings
                .and_then(|s| s.dedupe_minutes)
                .unwrap_or(defaults.default_dedupe_minutes),
        }
    }
}

/// Evaluate a prospective send. Checks run in fixed order: consent, quiet
/// hours, hourly cap, daily cap, dedupe. All counting queries are scoped by
/// tenant, contact, channel, and direction=outbound.
pub async fn evaluate(
    db: &Database,
    policy: &EffectivePolicy,
    intent: &SendIntent<'_>,
    now: DateTime<Utc>,
) -> Result<PolicyDecision, CourierError> {
    // 1. Consent.
    let preference =
        preferences::get_preference(db, intent.tenant_id, intent.contact_id, intent.channel)
            .await?;
    if let Some(pref) = preference
        && pref.consent_status == ConsentStatus::OptedOut
    {
        return Ok(PolicyDecision::denied(
            DenyCode::OptedOut,
            format!("contact opted out of {} via {}", intent.channel, pref.consent_source),
        ));
    }

    // 2. Quiet hours, in the tenant's local wall-clock time.
    if policy.quiet_hours_enabled
        && let (Some(start), Some(end)) = (
            policy.quiet_start.as_deref().and_then(quiet_hours::parse_hhmm),
            policy.quiet_end.as_deref().and_then(quiet_hours::parse_hhmm),
        )
    {
        let local = now.with_timezone(&policy.timezone);
        let now_minutes = local.hour() * 60 + local.minute();
        if quiet_hours::in_quiet_window(now_minutes, start, end) {
            return Ok(PolicyDecision::denied(
                DenyCode::QuietHours,
                format!(
                    "inside quiet hours {}-{} ({})",
                    policy.quiet_start.as_deref().unwrap_or(""),
                    policy.quiet_end.as_deref().unwrap_or(""),
                    policy.timezone
                ),
            ));
        }
    }

    // 3. Hourly cap.
    let hourly = messages::count_outbound_since(
        db,
        intent.tenant_id,
        intent.contact_id,
        intent.channel,
        60,
    )
    .await?;
    if hourly >= policy.hourly_cap {
        return Ok(PolicyDecision::denied(
            DenyCode::CapExceeded,
            format!("hourly cap reached ({hourly}/{})", policy.hourly_cap),
        ));
    }

    // 4. Daily cap.
    let daily = messages::count_outbound_since(
        db,
        intent.tenant_id,
        intent.contact_id,
        intent.channel,
        24 * 60,
    )
    .await?;
    if daily >= policy.daily_cap {
        return Ok(PolicyDecision::denied(
            DenyCode::CapExceeded,
            format!("daily cap reached ({daily}/{})", policy.daily_cap),
        ));
    }

    // 5. Dedupe.
    if let Some(key) = intent.dedupe_key {
        let duplicates = messages::count_dedupe_matches(
            db,
            intent.tenant_id,
            intent.contact_id,
            intent.channel,
            key,
            policy.dedupe_minutes,
        )
        .await?;
        if duplicates > 0 {
            return Ok(PolicyDecision::denied(
                DenyCode::Deduped,
                format!(
                    "dedupe key `{key}` already sent within {} minutes",
                    policy.dedupe_minutes
                ),
            ));
        }
    }

    debug!(
        tenant_id = intent.tenant_id,
        contact_id = intent.contact_id,
        channel = %intent.channel,
        "policy allowed"
    );
    Ok(PolicyDecision::Allowed)
}
