// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test infrastructure: in-memory store, pinned clock, capture
//! publisher, and entity builders.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use tripwire_core::clock::FixedClock;
use tripwire_core::events::EventService;
use tripwire_core::intake::IntakeService;
use tripwire_core::models::{
    Trigger, TriggerSchedule, TriggerStatus, TriggerType,
};
use tripwire_core::publish::MemoryPublisher;
use tripwire_core::store::{SqliteStore, TriggerStore};
use tripwire_core::triggers::TriggerService;

/// The pinned instant every suite starts from: 2025-01-02 03:00:00 UTC.
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 0).unwrap()
}

pub async fn sqlite_store() -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::in_memory()
            .await
            .expect("in-memory store should initialize"),
    )
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_instant()))
}

pub fn event_service(
    store: &Arc<SqliteStore>,
    publisher: &Arc<MemoryPublisher>,
    clock: &Arc<FixedClock>,
) -> Arc<EventService> {
    Arc::new(EventService::new(
        store.clone(),
        publisher.clone(),
        clock.clone(),
    ))
}

pub fn trigger_service(store: &Arc<SqliteStore>, clock: &Arc<FixedClock>) -> TriggerService {
    TriggerService::new(store.clone(), clock.clone())
}

pub fn intake_service(store: &Arc<SqliteStore>, events: &Arc<EventService>) -> IntakeService {
    IntakeService::new(store.clone(), events.clone())
}

/// A webhook trigger with a normalized config and no schedule rows.
pub fn webhook_trigger(now: DateTime<Utc>) -> Trigger {
    Trigger {
        id: Uuid::new_v4().to_string(),
        name: "hook".to_string(),
        trigger_type: TriggerType::Webhook,
        status: TriggerStatus::Active,
        config: json!({"endpoint": "https://example.com/hook", "http_method": "POST"}),
        created_at: now,
        updated_at: now,
    }
}

/// A cron trigger firing every five minutes, UTC.
pub fn cron_trigger(now: DateTime<Utc>) -> Trigger {
    Trigger {
        id: Uuid::new_v4().to_string(),
        name: "every-five".to_string(),
        trigger_type: TriggerType::CronScheduled,
        status: TriggerStatus::Active,
        config: json!({
            "cron": "*/5 * * * *",
            "timezone": "UTC",
            "endpoint": "https://example.com/cron",
            "http_method": "POST"
        }),
        created_at: now,
        updated_at: now,
    }
}

/// A one-shot trigger whose payload carries a marker field.
pub fn time_trigger(now: DateTime<Utc>, run_at: DateTime<Utc>) -> Trigger {
    Trigger {
        id: Uuid::new_v4().to_string(),
        name: "one-shot".to_string(),
        trigger_type: TriggerType::TimeScheduled,
        status: TriggerStatus::Active,
        config: json!({
            "run_at": run_at.to_rfc3339(),
            "timezone": "UTC",
            "endpoint": "https://example.com/once",
            "http_method": "POST",
            "payload": {"kind": "one-shot"}
        }),
        created_at: now,
        updated_at: now,
    }
}

/// Insert a trigger with one pending schedule and return both ids.
pub async fn seed_scheduled(
    store: &Arc<SqliteStore>,
    trigger: Trigger,
    fire_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> (String, String) {
    let schedule = TriggerSchedule::pending(&trigger.id, fire_at, now);
    store
        .create_trigger(&trigger, Some(&schedule))
        .await
        .expect("seed trigger");
    (trigger.id, schedule.id)
}

/// The body accepted by [`webhook_schema`].
pub fn valid_webhook_body() -> Value {
    json!({"x": 1})
}

/// Schema requiring a numeric `x`.
pub fn webhook_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"x": {"type": "number"}},
        "required": ["x"]
    })
}
