// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Repository interfaces and backends.
//!
//! The Trigger Repository is the only writer of `triggers` and
//! `trigger_schedules`; the Event Log Repository is the only writer of
//! `event_logs` and the idempotency mapping. Services compose both and never
//! reach into raw storage.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    EventLog, ExecutionStatus, ListEventsQuery, ListTriggersQuery, ScheduleStatus, Trigger,
    TriggerSchedule, TriggerStatus, TriggerType,
};

/// Partial update applied to a trigger row; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TriggerUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New status.
    pub status: Option<TriggerStatus>,
    /// New normalized config.
    pub config: Option<Value>,
}

impl TriggerUpdate {
    /// Whether the patch changes anything at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.status.is_none() && self.config.is_none()
    }
}

/// Persistence required by the trigger service and the scheduler engine.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Insert a trigger and, when present, its first schedule row atomically:
    /// both land or neither does.
    async fn create_trigger(
        &self,
        trigger: &Trigger,
        schedule: Option<&TriggerSchedule>,
    ) -> Result<()>;

    /// Fetch a trigger and the `fire_at` of its earliest pending or
    /// processing schedule, if any. Returns `None` when absent.
    async fn get_trigger(&self, id: &str) -> Result<Option<(Trigger, Option<DateTime<Utc>>)>>;

    /// List triggers matching the filter, newest first, with a per-row next
    /// fire hint and the unpaginated total.
    async fn list_triggers(
        &self,
        query: &ListTriggersQuery,
    ) -> Result<(Vec<Trigger>, Vec<Option<DateTime<Utc>>>, i64)>;

    /// Apply a partial update; errors with not-found when the row is absent.
    async fn update_trigger(
        &self,
        id: &str,
        update: &TriggerUpdate,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete a trigger. Schedule rows cascade; event logs survive with a
    /// nulled trigger reference. Errors with not-found when absent.
    async fn delete_trigger(&self, id: &str) -> Result<()>;

    /// Cancel all pending/processing schedules for the trigger and insert the
    /// replacement, when given, in one transaction.
    async fn upsert_trigger_schedule(
        &self,
        trigger_id: &str,
        schedule: Option<&TriggerSchedule>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Pending schedules due at or before `now` whose trigger is active,
    /// joined with their trigger, ordered by `fire_at` ascending.
    async fn due_schedules(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(TriggerSchedule, Trigger)>>;

    /// The claim: conditionally move a schedule from `pending` to
    /// `processing`. Returns whether this caller won; exactly one concurrent
    /// claimer observes `true`.
    async fn claim_schedule(&self, id: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Unconditional status transition; errors with not-found when absent.
    async fn update_schedule_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Move a schedule back to `pending` for retry, incrementing
    /// `attempt_count` and stamping `last_attempt_at`.
    async fn revert_schedule_to_pending(&self, id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Insert a new pending occurrence for a cron trigger.
    async fn create_next_schedule(&self, schedule: &TriggerSchedule) -> Result<()>;

    /// Set a trigger's status to inactive. Idempotent; absent rows are a no-op.
    async fn deactivate_trigger(&self, id: &str, now: DateTime<Utc>) -> Result<()>;

    /// One-shot crash recovery: move every `processing` schedule back to
    /// `pending`, leaving attempt counts untouched. Returns the rows moved.
    async fn reset_processing_schedules(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Persistence for the immutable event log and the idempotency mapping.
#[async_trait]
pub trait EventLogStore: Send + Sync {
    /// Insert exactly one event log row.
    async fn create_event_log(&self, log: &EventLog) -> Result<()>;

    /// Patch the two mutable fields; used solely on publish failure.
    async fn update_event_log_status(
        &self,
        id: &str,
        status: ExecutionStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// List event logs, newest fire first, with the unpaginated total. A
    /// filter without a retention status sees `active` rows only.
    async fn list_event_logs(&self, query: &ListEventsQuery) -> Result<(Vec<EventLog>, i64)>;

    /// Fetch one event log; `None` (not an error) when absent.
    async fn get_event_log(&self, id: &str) -> Result<Option<EventLog>>;

    /// Retention: archive active rows fired before `cutoff`. Returns rows moved.
    async fn archive_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Retention: physically delete rows fired before `cutoff`, regardless of
    /// archival state. Returns rows removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Record a consumer-side `job_id -> event_id` deduplication hint.
    async fn record_idempotency(
        &self,
        job_id: &str,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Look up the event id previously recorded for `job_id`.
    async fn get_idempotency(&self, job_id: &str) -> Result<Option<String>>;

    /// Prune idempotency mappings created before `cutoff`. Returns rows removed.
    async fn prune_idempotency_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Flat row for the due-schedules join; unique column aliases keep the two
/// entities apart.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct DueScheduleRow {
    pub schedule_id: String,
    pub trigger_id: String,
    pub fire_at: DateTime<Utc>,
    pub schedule_status: ScheduleStatus,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub schedule_created_at: DateTime<Utc>,
    pub schedule_updated_at: DateTime<Utc>,
    pub id: String,
    pub name: String,
    pub trigger_type: TriggerType,
    pub status: TriggerStatus,
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DueScheduleRow {
    pub(crate) fn into_parts(self) -> (TriggerSchedule, Trigger) {
        (
            TriggerSchedule {
                id: self.schedule_id,
                trigger_id: self.trigger_id,
                fire_at: self.fire_at,
                status: self.schedule_status,
                attempt_count: self.attempt_count,
                last_attempt_at: self.last_attempt_at,
                created_at: self.schedule_created_at,
                updated_at: self.schedule_updated_at,
            },
            Trigger {
                id: self.id,
                name: self.name,
                trigger_type: self.trigger_type,
                status: self.status,
                config: self.config,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        )
    }
}

/// Trigger row joined with its next fire hint for list queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TriggerWithNextRow {
    pub id: String,
    pub name: String,
    pub trigger_type: TriggerType,
    pub status: TriggerStatus,
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_fire_at: Option<DateTime<Utc>>,
}

impl TriggerWithNextRow {
    pub(crate) fn into_parts(self) -> (Trigger, Option<DateTime<Utc>>) {
        (
            Trigger {
                id: self.id,
                name: self.name,
                trigger_type: self.trigger_type,
                status: self.status,
                config: self.config,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.next_fire_at,
        )
    }
}
