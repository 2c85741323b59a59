// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API error type and its HTTP status mapping.
//!
//! Validation errors surface as 400 with their reason, not-found as 404;
//! infrastructure errors are logged and collapse to a generic 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::ErrorResponse;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Error bubbled up from the core services.
    #[error(transparent)]
    Core(#[from] tripwire_core::Error),
    /// Malformed request at the HTTP layer.
    #[error("{0}")]
    BadRequest(String),
    /// Entity referenced by the path does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(err) if err.is_validation() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Core(err) if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::Core(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = ErrorResponse {
            error: message,
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripwire_core::Error;

    #[test]
    fn core_errors_map_to_expected_statuses() {
        assert_eq!(
            ApiError::from(Error::validation("bad input"))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::TriggerNotFound("x".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::Publish {
                event_id: "e".into(),
                reason: "broker down".into()
            })
            .into_response()
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NotFound("event not found".into())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
    }
}
