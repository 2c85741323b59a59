// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tripwire Server - HTTP API
//!
//! Thin axum layer over the core services:
//!
//! | Path | Method | Semantics |
//! |------|--------|-----------|
//! | `/api/v1/triggers` | POST | create trigger (201) |
//! | `/api/v1/triggers` | GET | list with filter + pagination |
//! | `/api/v1/triggers/{id}` | GET / PUT / DELETE | fetch / update / delete |
//! | `/api/v1/triggers/{id}/test` | POST | manual test run (202 with event id) |
//! | `/api/v1/webhook/{trigger_id}` | POST | webhook intake (202 with event id) |
//! | `/api/v1/events` | GET | filtered event log list |
//! | `/api/v1/events/{id}` | GET | fetch one event log |
//! | `/health`, `/metrics` | GET | observability |
//!
//! Validation errors map to 400 with their reason, not-found to 404,
//! infrastructure failures to 500. Webhook URLs returned on create are
//! `{scheme}://{host}/api/v1/webhook/{trigger_id}`, derived from the
//! request's host and forwarded headers.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use tripwire_core::events::EventService;
use tripwire_core::intake::IntakeService;
use tripwire_core::triggers::TriggerService;

pub mod error;
pub mod response;
pub mod routes;

/// Shared handler state: the three core services.
#[derive(Clone)]
pub struct AppState {
    /// Trigger CRUD and schedule materialization.
    pub triggers: Arc<TriggerService>,
    /// Event firing and queries.
    pub events: Arc<EventService>,
    /// Webhook intake and manual test runs.
    pub intake: Arc<IntakeService>,
}

/// Build the API router over the given state.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/triggers",
            post(routes::triggers::create_trigger).get(routes::triggers::list_triggers),
        )
        .route(
            "/triggers/{id}",
            get(routes::triggers::get_trigger)
                .put(routes::triggers::update_trigger)
                .delete(routes::triggers::delete_trigger),
        )
        .route("/triggers/{id}/test", post(routes::triggers::test_trigger))
        .route("/webhook/{trigger_id}", post(routes::webhooks::receive_webhook))
        .route("/events", get(routes::events::list_events))
        .route("/events/{id}", get(routes::events::get_event));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics))
        .nest("/api/v1", api)
        .with_state(state)
}
