// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal endpoints: the dispatch trigger and liveness.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use courier_core::CourierError;
use courier_outbox::run_dispatch;
use courier_verify::secret::constant_time_eq;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DispatchParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DispatchAck {
    pub ok: bool,
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /internal/dispatch?limit=N
///
/// Drains one batch from the outbox. Authenticated with a shared secret
/// header compared in constant time; a missing configured secret is a server
/// misconfiguration, not an open door.
pub async fn post_dispatch(
    State(state): State<AppState>,
    Query(params): Query<DispatchParams>,
    headers: HeaderMap,
) -> Result<Json<DispatchAck>, ApiError> {
    let expected = state
        .config
        .webhooks
        .internal_dispatch_secret
        .as_deref()
        .ok_or_else(|| {
            CourierError::Config("webhooks.internal_dispatch_secret is not set".to_string())
        })?;
    let provided = headers
        .get("x-courier-internal-secret")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            CourierError::InvalidSignature("missing x-courier-internal-secret header".to_string())
        })?;
    if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        return Err(CourierError::InvalidSignature("dispatch secret mismatch".to_string()).into());
    }

    let limit = params
        .limit
        .unwrap_or(state.config.dispatch.batch_limit)
        .clamp(1, state.config.dispatch.batch_limit);
    let report = run_dispatch(&state.db, &state.senders, limit).await?;
    info!(sent = report.sent, failed = report.failed, "dispatch triggered");
    Ok(Json(DispatchAck {
        ok: true,
        sent: report.sent,
        failed: report.failed,
    }))
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
