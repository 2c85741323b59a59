// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event firing service tests: log-then-publish ordering, the publish-failure
//! patch, the bounded publish deadline, and event queries.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use tripwire_core::error::Error;
use tripwire_core::events::EventService;
use tripwire_core::models::{
    EventSource, ExecutionStatus, ListEventsQuery, RetentionStatus,
};
use tripwire_core::publish::{MemoryPublisher, Publisher, TriggerEvent};
use tripwire_core::store::EventLogStore;

use common::{cron_trigger, event_service, fixed_clock, fixed_instant, sqlite_store, webhook_trigger};

#[tokio::test]
async fn fire_writes_log_and_publishes() {
    let store = sqlite_store().await;
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = fixed_clock();
    let svc = event_service(&store, &publisher, &clock);

    let trigger = cron_trigger(fixed_instant());
    store
        .create_event_log(&tripwire_core::models::EventLog {
            // Unrelated pre-existing row to make sure queries pick the right one.
            id: "seed".into(),
            trigger_id: None,
            trigger_type: trigger.trigger_type,
            fired_at: fixed_instant(),
            payload: None,
            source: EventSource::ManualTest,
            execution_status: ExecutionStatus::Success,
            error_message: None,
            retention_status: RetentionStatus::Archived,
            is_test_run: true,
            created_at: fixed_instant(),
        })
        .await
        .unwrap();

    let event_id = svc
        .fire_trigger(&trigger, EventSource::Scheduler, Some(json!({"k": "v"})), false)
        .await
        .unwrap();

    // Exactly one publish with the same event id and payload.
    let published = publisher.events();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].event_id, event_id);
    assert_eq!(published[0].trigger_id.as_deref(), Some(trigger.id.as_str()));
    assert_eq!(published[0].payload, json!({"k": "v"}));
    assert_eq!(published[0].source, EventSource::Scheduler);

    // Exactly one matching log row with success status.
    let log = svc.get_event(&event_id).await.unwrap().expect("log exists");
    assert_eq!(log.execution_status, ExecutionStatus::Success);
    assert_eq!(log.source, EventSource::Scheduler);
    assert_eq!(log.retention_status, RetentionStatus::Active);
    assert_eq!(log.fired_at, fixed_instant());
    assert!(!log.is_test_run);
    assert!(log.error_message.is_none());
}

#[tokio::test]
async fn publish_failure_patches_log_and_returns_event_id() {
    let store = sqlite_store().await;
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = fixed_clock();
    let svc = event_service(&store, &publisher, &clock);

    publisher.fail_next();

    let trigger = cron_trigger(fixed_instant());
    let err = svc
        .fire_trigger(&trigger, EventSource::Scheduler, None, true)
        .await
        .unwrap_err();

    let Error::Publish { event_id, .. } = err else {
        panic!("expected publish error, got {err:?}");
    };

    let log = svc.get_event(&event_id).await.unwrap().expect("log exists");
    assert_eq!(log.execution_status, ExecutionStatus::Failure);
    assert!(log.is_test_run);
    assert!(
        log.error_message
            .as_deref()
            .unwrap()
            .contains("bus publish failed")
    );
}

struct SlowPublisher;

#[async_trait]
impl Publisher for SlowPublisher {
    async fn publish(&self, _event: &TriggerEvent) -> tripwire_core::Result<()> {
        tokio::time::sleep(Duration::from_millis(250)).await;
        Ok(())
    }
}

#[tokio::test]
async fn publish_deadline_is_bounded() {
    let store = sqlite_store().await;
    let clock = fixed_clock();
    let svc = EventService::new(store.clone(), Arc::new(SlowPublisher), clock)
        .with_publish_timeout(Duration::from_millis(20));

    let trigger = webhook_trigger(fixed_instant());
    let err = svc
        .fire_trigger(&trigger, EventSource::Webhook, Some(json!({})), false)
        .await
        .unwrap_err();

    let Error::Publish { event_id, reason } = err else {
        panic!("expected publish error, got {err:?}");
    };
    assert!(reason.contains("timed out"));

    let log = store.get_event_log(&event_id).await.unwrap().unwrap();
    assert_eq!(log.execution_status, ExecutionStatus::Failure);
}

#[tokio::test]
async fn query_events_filters_and_paginates() {
    let store = sqlite_store().await;
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = fixed_clock();
    let svc = event_service(&store, &publisher, &clock);

    let hook = webhook_trigger(fixed_instant());
    let cron = cron_trigger(fixed_instant());

    let hook_event = svc
        .fire_trigger(&hook, EventSource::Webhook, Some(json!({"k": "v1"})), false)
        .await
        .unwrap();
    let cron_event = svc
        .fire_trigger(&cron, EventSource::Scheduler, Some(json!({"k": "v2"})), true)
        .await
        .unwrap();

    // Filter by trigger id.
    let (events, pagination) = svc
        .query_events(&ListEventsQuery {
            trigger_id: Some(hook.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, hook_event);
    assert_eq!(pagination.total_records, 1);

    // Filter by source.
    let (events, _) = svc
        .query_events(&ListEventsQuery {
            source: Some(EventSource::Scheduler),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, cron_event);

    // Filter by execution status sees both.
    let (events, _) = svc
        .query_events(&ListEventsQuery {
            execution_status: Some(ExecutionStatus::Success),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 2);

    // Pagination clamps and counts.
    let (events, pagination) = svc
        .query_events(&ListEventsQuery {
            page: Some(1),
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(pagination.total_records, 2);
    assert_eq!(pagination.total_pages, 2);
    assert_eq!(pagination.page_size, 1);
}

#[tokio::test]
async fn get_event_absent_is_none() {
    let store = sqlite_store().await;
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = fixed_clock();
    let svc = event_service(&store, &publisher, &clock);

    assert!(svc.get_event("nonexistent").await.unwrap().is_none());
}

#[tokio::test]
async fn fire_without_persisted_trigger_has_null_reference() {
    let store = sqlite_store().await;
    let publisher = Arc::new(MemoryPublisher::new());
    let clock = fixed_clock();
    let svc = event_service(&store, &publisher, &clock);

    let mut trigger = webhook_trigger(fixed_instant());
    trigger.id = String::new();

    let event_id = svc
        .fire_trigger(&trigger, EventSource::ManualTest, None, true)
        .await
        .unwrap();

    let log = svc.get_event(&event_id).await.unwrap().unwrap();
    assert!(log.trigger_id.is_none());
    assert_eq!(publisher.events()[0].trigger_id, None);
    assert_eq!(publisher.events()[0].key(), event_id);
}
