// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared test infrastructure for the scheduler worker tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use tripwire_core::clock::{Clock, FixedClock};
use tripwire_core::events::EventService;
use tripwire_core::models::{Trigger, TriggerSchedule, TriggerStatus, TriggerType};
use tripwire_core::publish::MemoryPublisher;
use tripwire_core::store::{SqliteStore, TriggerStore};

/// The pinned instant every suite starts from: 2025-01-02 03:00:00 UTC.
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 0).unwrap()
}

/// Everything a worker test needs: store, clock, publisher, firing service.
pub struct TestContext {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<FixedClock>,
    pub publisher: Arc<MemoryPublisher>,
    pub events: Arc<EventService>,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(
            SqliteStore::in_memory()
                .await
                .expect("in-memory store should initialize"),
        );
        let clock = Arc::new(FixedClock::new(fixed_instant()));
        let publisher = Arc::new(MemoryPublisher::new());
        let events = Arc::new(EventService::new(
            store.clone(),
            publisher.clone(),
            clock.clone(),
        ));
        Self {
            store,
            clock,
            publisher,
            events,
        }
    }

    /// Insert a cron trigger (every five minutes, UTC) with a pending
    /// schedule at `fire_at`.
    pub async fn seed_cron(&self, fire_at: DateTime<Utc>) -> (Trigger, TriggerSchedule) {
        let now = self.clock.now();
        let trigger = Trigger {
            id: Uuid::new_v4().to_string(),
            name: "every-five".to_string(),
            trigger_type: TriggerType::CronScheduled,
            status: TriggerStatus::Active,
            config: json!({
                "cron": "*/5 * * * *",
                "timezone": "UTC",
                "endpoint": "https://example.com/cron",
                "http_method": "POST",
                "payload": {"job": "report"}
            }),
            created_at: now,
            updated_at: now,
        };
        let schedule = TriggerSchedule::pending(&trigger.id, fire_at, now);
        self.store
            .create_trigger(&trigger, Some(&schedule))
            .await
            .expect("seed cron trigger");
        (trigger, schedule)
    }

    /// Insert a one-shot trigger with a pending schedule at `fire_at`.
    pub async fn seed_one_shot(&self, fire_at: DateTime<Utc>) -> (Trigger, TriggerSchedule) {
        let now = self.clock.now();
        let trigger = Trigger {
            id: Uuid::new_v4().to_string(),
            name: "one-shot".to_string(),
            trigger_type: TriggerType::TimeScheduled,
            status: TriggerStatus::Active,
            config: json!({
                "run_at": fire_at.to_rfc3339(),
                "timezone": "UTC",
                "endpoint": "https://example.com/once",
                "http_method": "POST"
            }),
            created_at: now,
            updated_at: now,
        };
        let schedule = TriggerSchedule::pending(&trigger.id, fire_at, now);
        self.store
            .create_trigger(&trigger, Some(&schedule))
            .await
            .expect("seed one-shot trigger");
        (trigger, schedule)
    }
}
