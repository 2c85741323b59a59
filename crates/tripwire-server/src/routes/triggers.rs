// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trigger management handlers: CRUD plus manual test runs.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::info;

use tripwire_core::models::{
    CreateTriggerRequest, ListTriggersQuery, TriggerResponse, TriggerType, UpdateTriggerRequest,
};

use crate::AppState;
use crate::error::ApiError;
use crate::response::SuccessResponse;

pub async fn create_trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTriggerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut trigger = state.triggers.create(req).await?;
    decorate_webhook_url(&headers, &mut trigger);

    info!(
        trigger_id = %trigger.id,
        trigger_type = %trigger.trigger_type,
        "trigger created"
    );

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_message(
            trigger,
            "trigger created successfully",
        )),
    ))
}

pub async fn list_triggers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListTriggersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut list = state.triggers.list(query).await?;
    for trigger in &mut list.triggers {
        decorate_webhook_url(&headers, trigger);
    }
    Ok(Json(SuccessResponse::new(list)))
}

pub async fn get_trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut trigger = state.triggers.get(&id).await?;
    decorate_webhook_url(&headers, &mut trigger);
    Ok(Json(SuccessResponse::new(trigger)))
}

pub async fn update_trigger(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdateTriggerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut trigger = state.triggers.update(&id, req).await?;
    decorate_webhook_url(&headers, &mut trigger);
    Ok(Json(SuccessResponse::new(trigger)))
}

pub async fn delete_trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.triggers.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fire a trigger once for testing; an optional JSON body becomes the payload.
pub async fn test_trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = if body.is_empty() {
        None
    } else {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid test payload: {e}")))?;
        Some(value)
    };
    let event_id = state.intake.test_run(&id, payload).await?;

    info!(trigger_id = %id, event_id = %event_id, "test run fired");

    Ok((
        StatusCode::ACCEPTED,
        Json(SuccessResponse::with_message(
            json!({"event_id": event_id, "trigger_id": id}),
            "test run fired",
        )),
    ))
}

/// Webhook triggers get their receiver URL derived from the request's host
/// and forwarded-proto headers.
fn decorate_webhook_url(headers: &HeaderMap, trigger: &mut TriggerResponse) {
    if trigger.trigger_type != TriggerType::Webhook {
        return;
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|host| !host.is_empty());

    if let Some(host) = host {
        trigger.webhook_url = Some(format!("{scheme}://{host}/api/v1/webhook/{}", trigger.id));
    }
}
