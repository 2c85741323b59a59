// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retention worker tests with compressed windows.

mod common;

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use uuid::Uuid;

use tripwire_core::models::{
    EventLog, EventSource, ExecutionStatus, ListEventsQuery, RetentionStatus, TriggerType,
};
use tripwire_core::store::EventLogStore;
use tripwire_scheduler::{RetentionWorker, RetentionWorkerConfig};

use common::{TestContext, fixed_instant};

fn compressed_config() -> RetentionWorkerConfig {
    RetentionWorkerConfig {
        archive_interval: Duration::from_millis(10),
        archive_age: Duration::from_secs(10),
        delete_interval: Duration::from_millis(10),
        delete_age: Duration::from_secs(30),
        idempotency_ttl: Duration::from_secs(60),
    }
}

fn worker(ctx: &TestContext, config: RetentionWorkerConfig) -> RetentionWorker {
    RetentionWorker::new(ctx.store.clone(), ctx.clock.clone(), config)
}

async fn seed_event(ctx: &TestContext, fired_at: DateTime<Utc>) -> String {
    let log = EventLog {
        id: Uuid::new_v4().to_string(),
        trigger_id: None,
        trigger_type: TriggerType::Webhook,
        fired_at,
        payload: Some(json!({"n": 1})),
        source: EventSource::Webhook,
        execution_status: ExecutionStatus::Success,
        error_message: None,
        retention_status: RetentionStatus::Active,
        is_test_run: false,
        created_at: fired_at,
    };
    ctx.store.create_event_log(&log).await.unwrap();
    log.id
}

#[tokio::test]
async fn event_is_archived_then_deleted_by_age() {
    let ctx = TestContext::new().await;
    let worker = worker(&ctx, compressed_config());

    let t0 = fixed_instant();
    let event_id = seed_event(&ctx, t0).await;

    // At t0 + 15 s the row crosses the 10 s archive age.
    ctx.clock.set(t0 + ChronoDuration::seconds(15));
    assert_eq!(worker.archive_pass().await.unwrap(), 1);

    let (active, _) = ctx
        .store
        .list_event_logs(&ListEventsQuery::default())
        .await
        .unwrap();
    assert!(active.is_empty());

    let (archived, _) = ctx
        .store
        .list_event_logs(&ListEventsQuery {
            retention_status: Some(RetentionStatus::Archived),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].id, event_id);

    // Still short of the 30 s delete age: nothing removed yet.
    assert_eq!(worker.delete_pass().await.unwrap(), 0);
    assert!(ctx.store.get_event_log(&event_id).await.unwrap().is_some());

    // At t0 + 35 s the row crosses the delete age, measured from fired_at.
    ctx.clock.set(t0 + ChronoDuration::seconds(35));
    assert_eq!(worker.delete_pass().await.unwrap(), 1);

    assert!(ctx.store.get_event_log(&event_id).await.unwrap().is_none());
    let (archived, _) = ctx
        .store
        .list_event_logs(&ListEventsQuery {
            retention_status: Some(RetentionStatus::Archived),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(archived.is_empty());
}

#[tokio::test]
async fn fresh_events_are_left_alone() {
    let ctx = TestContext::new().await;
    let worker = worker(&ctx, compressed_config());

    let t0 = fixed_instant();
    let event_id = seed_event(&ctx, t0).await;

    // Inside both windows: neither pass touches the row.
    ctx.clock.set(t0 + ChronoDuration::seconds(5));
    assert_eq!(worker.archive_pass().await.unwrap(), 0);
    assert_eq!(worker.delete_pass().await.unwrap(), 0);

    let log = ctx.store.get_event_log(&event_id).await.unwrap().unwrap();
    assert_eq!(log.retention_status, RetentionStatus::Active);
}

#[tokio::test]
async fn delete_runs_from_fired_at_even_if_never_archived() {
    let ctx = TestContext::new().await;
    let worker = worker(&ctx, compressed_config());

    // An event already past the delete age goes straight out; how long it
    // spent archived is irrelevant.
    let t0 = fixed_instant();
    let event_id = seed_event(&ctx, t0 - ChronoDuration::seconds(40)).await;

    assert_eq!(worker.delete_pass().await.unwrap(), 1);
    assert!(ctx.store.get_event_log(&event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_pass_prunes_idempotency_mappings() {
    let ctx = TestContext::new().await;
    let worker = worker(&ctx, compressed_config());

    let t0 = fixed_instant();
    ctx.store
        .record_idempotency("job-old", "event-old", t0 - ChronoDuration::seconds(120))
        .await
        .unwrap();
    ctx.store
        .record_idempotency("job-new", "event-new", t0)
        .await
        .unwrap();

    worker.delete_pass().await.unwrap();

    assert!(ctx.store.get_idempotency("job-old").await.unwrap().is_none());
    assert_eq!(
        ctx.store.get_idempotency("job-new").await.unwrap().as_deref(),
        Some("event-new")
    );
}

#[tokio::test]
async fn worker_loop_archives_until_shutdown() {
    let ctx = TestContext::new().await;
    let worker = worker(&ctx, compressed_config());
    let shutdown = worker.shutdown_handle();

    // Fired well past the archive age relative to the pinned clock.
    let event_id = seed_event(&ctx, fixed_instant() - ChronoDuration::hours(1)).await;

    let handle = tokio::spawn(async move { worker.run().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.notify_one();
    handle.await.expect("worker task failed");

    let log = ctx.store.get_event_log(&event_id).await.unwrap();
    // The 1 h old event is far past the 30 s delete age, so the loop's delete
    // pass removed it.
    assert!(log.is_none());
}
