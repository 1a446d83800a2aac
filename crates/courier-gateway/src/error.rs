// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-HTTP mapping for webhook handlers.
//!
//! Signature failures map to 403 so providers mark the webhook misconfigured
//! instead of retrying forever; validation errors to 400; unknown resources
//! to 404; everything else is a 500 whose detail stays in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use courier_core::CourierError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Newtype so `CourierError` can cross the axum boundary with `?`.
pub struct ApiError(pub CourierError);

impl From<CourierError> for ApiError {
    fn from(e: CourierError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CourierError::InvalidSignature(_) | CourierError::StaleTimestamp { .. } => {
                StatusCode::FORBIDDEN
            }
            CourierError::NotFound(_) => StatusCode::NOT_FOUND,
            CourierError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "webhook handler error");
            "internal error".to_string()
        } else {
            warn!(error = %self.0, status = %status, "webhook rejected");
            self.0.to_string()
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
