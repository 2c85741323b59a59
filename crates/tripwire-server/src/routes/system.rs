// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Health and metrics endpoints.

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use tripwire_core::models::{
    ExecutionStatus, ListEventsQuery, ListTriggersQuery, RetentionStatus, TriggerType,
};

use crate::AppState;
use crate::error::ApiError;
use crate::response::SuccessResponse;

/// Health check payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub async fn health() -> impl IntoResponse {
    Json(SuccessResponse::new(HealthResponse {
        status: "ok".to_string(),
        service: "tripwire".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Platform counters reported by `/metrics`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub published_events_count: i64,
    pub events_active_count: i64,
    pub events_archived_count: i64,
    pub trigger_count_scheduled: i64,
    pub trigger_count_webhook: i64,
}

pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let count_events = |query: ListEventsQuery| {
        let events = state.events.clone();
        async move {
            let (_, pagination) = events
                .query_events(&ListEventsQuery {
                    limit: Some(1),
                    ..query
                })
                .await?;
            Ok::<_, ApiError>(pagination.total_records)
        }
    };
    let count_triggers = |query: ListTriggersQuery| {
        let triggers = state.triggers.clone();
        async move {
            let list = triggers
                .list(ListTriggersQuery {
                    limit: Some(1),
                    ..query
                })
                .await?;
            Ok::<_, ApiError>(list.pagination.total_records)
        }
    };

    let events_active_count = count_events(ListEventsQuery::default()).await?;
    let events_archived_count = count_events(ListEventsQuery {
        retention_status: Some(RetentionStatus::Archived),
        ..Default::default()
    })
    .await?;
    let published_events_count = count_events(ListEventsQuery {
        execution_status: Some(ExecutionStatus::Success),
        ..Default::default()
    })
    .await?;

    let trigger_count_webhook = count_triggers(ListTriggersQuery {
        trigger_type: Some(TriggerType::Webhook),
        ..Default::default()
    })
    .await?;
    let trigger_count_scheduled = count_triggers(ListTriggersQuery {
        trigger_type: Some(TriggerType::TimeScheduled),
        ..Default::default()
    })
    .await?
        + count_triggers(ListTriggersQuery {
            trigger_type: Some(TriggerType::CronScheduled),
            ..Default::default()
        })
        .await?;

    Ok(Json(SuccessResponse::new(MetricsResponse {
        published_events_count,
        events_active_count,
        events_archived_count,
        trigger_count_scheduled,
        trigger_count_webhook,
    })))
}
