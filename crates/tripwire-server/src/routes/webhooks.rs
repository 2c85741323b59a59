// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Webhook receiver: validates the inbound body against the trigger's stored
//! schema and fires the trigger.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use crate::response::SuccessResponse;

pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(trigger_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest(
            "webhook payload must be a JSON object".to_string(),
        ));
    }

    let event_id = state.intake.receive_webhook(&trigger_id, payload).await?;

    info!(trigger_id = %trigger_id, event_id = %event_id, "webhook accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse::with_message(
            json!({"event_id": event_id, "trigger_id": trigger_id}),
            "webhook accepted and trigger queued",
        )),
    ))
}
