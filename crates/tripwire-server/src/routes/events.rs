// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event log query handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use tripwire_core::models::{EventLogListResponse, ListEventsQuery};

use crate::AppState;
use crate::error::ApiError;
use crate::response::SuccessResponse;

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (events, pagination) = state.events.query_events(&query).await?;
    Ok(Json(SuccessResponse::new(EventLogListResponse {
        events,
        pagination,
    })))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .events
        .get_event(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound("event not found".to_string()))?;
    Ok(Json(SuccessResponse::new(event)))
}
