// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed repository implementation.
//!
//! Used for embedded and development setups and by the test suites;
//! PostgreSQL is the production backend.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{Error, Result};
use crate::models::{
    EventLog, ExecutionStatus, ListEventsQuery, ListTriggersQuery, RetentionStatus,
    ScheduleStatus, Trigger, TriggerSchedule, clamp_page,
};

use super::{DueScheduleRow, EventLogStore, TriggerStore, TriggerUpdate, TriggerWithNextRow};

/// SQLite-backed trigger and event log repositories.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a store backed by a database file.
    ///
    /// Creates parent directories and the file as needed, enables foreign
    /// keys, and runs all migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let options = SqliteConnectOptions::from_str(&url)?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        crate::migrations::run_sqlite(&pool).await?;
        Ok(Self { pool })
    }

    /// Create and initialize an in-memory store.
    ///
    /// The pool is capped at one connection; each SQLite in-memory connection
    /// is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        crate::migrations::run_sqlite(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TriggerStore for SqliteStore {
    async fn create_trigger(
        &self,
        trigger: &Trigger,
        schedule: Option<&TriggerSchedule>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO triggers (id, name, trigger_type, status, config, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&trigger.id)
        .bind(&trigger.name)
        .bind(trigger.trigger_type)
        .bind(trigger.status)
        .bind(&trigger.config)
        .bind(trigger.created_at)
        .bind(trigger.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(schedule) = schedule {
            sqlx::query(
                r#"
                INSERT INTO trigger_schedules
                    (id, trigger_id, fire_at, status, attempt_count, last_attempt_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&schedule.id)
            .bind(&trigger.id)
            .bind(schedule.fire_at)
            .bind(schedule.status)
            .bind(schedule.attempt_count)
            .bind(schedule.last_attempt_at)
            .bind(schedule.created_at)
            .bind(schedule.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_trigger(&self, id: &str) -> Result<Option<(Trigger, Option<DateTime<Utc>>)>> {
        let trigger = sqlx::query_as::<_, Trigger>(
            r#"
            SELECT id, name, trigger_type, status, config, created_at, updated_at
            FROM triggers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(trigger) = trigger else {
            return Ok(None);
        };

        let next = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT fire_at
            FROM trigger_schedules
            WHERE trigger_id = ? AND status IN ('pending', 'processing')
            ORDER BY fire_at ASC
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Some((trigger, next)))
    }

    async fn list_triggers(
        &self,
        query: &ListTriggersQuery,
    ) -> Result<(Vec<Trigger>, Vec<Option<DateTime<Utc>>>, i64)> {
        let (page, limit) = clamp_page(query.page, query.limit);
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM triggers
            WHERE (?1 IS NULL OR trigger_type = ?1)
              AND (?2 IS NULL OR status = ?2)
            "#,
        )
        .bind(query.trigger_type)
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, TriggerWithNextRow>(
            r#"
            SELECT id, name, trigger_type, status, config, created_at, updated_at,
                (
                    SELECT fire_at FROM trigger_schedules
                    WHERE trigger_id = triggers.id
                      AND status IN ('pending', 'processing')
                    ORDER BY fire_at ASC
                    LIMIT 1
                ) AS next_fire_at
            FROM triggers
            WHERE (?1 IS NULL OR trigger_type = ?1)
              AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, id
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(query.trigger_type)
        .bind(query.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut triggers = Vec::with_capacity(rows.len());
        let mut next_runs = Vec::with_capacity(rows.len());
        for row in rows {
            let (trigger, next) = row.into_parts();
            triggers.push(trigger);
            next_runs.push(next);
        }

        Ok((triggers, next_runs, total))
    }

    async fn update_trigger(
        &self,
        id: &str,
        update: &TriggerUpdate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE triggers
            SET name = COALESCE(?2, name),
                status = COALESCE(?3, status),
                config = COALESCE(?4, config),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(update.status)
        .bind(&update.config)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::TriggerNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_trigger(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM triggers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::TriggerNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn upsert_trigger_schedule(
        &self,
        trigger_id: &str,
        schedule: Option<&TriggerSchedule>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE trigger_schedules
            SET status = 'cancelled', updated_at = ?2
            WHERE trigger_id = ?1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(trigger_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(schedule) = schedule {
            sqlx::query(
                r#"
                INSERT INTO trigger_schedules
                    (id, trigger_id, fire_at, status, attempt_count, last_attempt_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&schedule.id)
            .bind(trigger_id)
            .bind(schedule.fire_at)
            .bind(schedule.status)
            .bind(schedule.attempt_count)
            .bind(schedule.last_attempt_at)
            .bind(schedule.created_at)
            .bind(schedule.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn due_schedules(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(TriggerSchedule, Trigger)>> {
        let rows = sqlx::query_as::<_, DueScheduleRow>(
            r#"
            SELECT
                ts.id AS schedule_id, ts.trigger_id, ts.fire_at,
                ts.status AS schedule_status, ts.attempt_count, ts.last_attempt_at,
                ts.created_at AS schedule_created_at, ts.updated_at AS schedule_updated_at,
                t.id, t.name, t.trigger_type, t.status, t.config, t.created_at, t.updated_at
            FROM trigger_schedules ts
            INNER JOIN triggers t ON ts.trigger_id = t.id
            WHERE ts.fire_at <= ?
              AND ts.status = 'pending'
              AND t.status = 'active'
            ORDER BY ts.fire_at ASC
            LIMIT ?
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DueScheduleRow::into_parts).collect())
    }

    async fn claim_schedule(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE trigger_schedules
            SET status = 'processing', updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_schedule_status(
        &self,
        id: &str,
        status: ScheduleStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE trigger_schedules
            SET status = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ScheduleNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn revert_schedule_to_pending(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE trigger_schedules
            SET status = 'pending',
                attempt_count = attempt_count + 1,
                last_attempt_at = ?2,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::ScheduleNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_next_schedule(&self, schedule: &TriggerSchedule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trigger_schedules
                (id, trigger_id, fire_at, status, attempt_count, last_attempt_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&schedule.id)
        .bind(&schedule.trigger_id)
        .bind(schedule.fire_at)
        .bind(schedule.status)
        .bind(schedule.attempt_count)
        .bind(schedule.last_attempt_at)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate_trigger(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE triggers
            SET status = 'inactive', updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_processing_schedules(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE trigger_schedules
            SET status = 'pending', updated_at = ?
            WHERE status = 'processing'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventLogStore for SqliteStore {
    async fn create_event_log(&self, log: &EventLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_logs
                (id, trigger_id, trigger_type, fired_at, payload, source,
                 execution_status, error_message, retention_status, is_test_run, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.id)
        .bind(&log.trigger_id)
        .bind(log.trigger_type)
        .bind(log.fired_at)
        .bind(&log.payload)
        .bind(log.source)
        .bind(log.execution_status)
        .bind(&log.error_message)
        .bind(log.retention_status)
        .bind(log.is_test_run)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_event_log_status(
        &self,
        id: &str,
        status: ExecutionStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE event_logs
            SET execution_status = ?2, error_message = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_event_logs(&self, query: &ListEventsQuery) -> Result<(Vec<EventLog>, i64)> {
        let retention = query.retention_status.unwrap_or(RetentionStatus::Active);
        let (page, limit) = clamp_page(query.page, query.limit);
        let offset = (page - 1) * limit;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM event_logs
            WHERE retention_status = ?1
              AND (?2 IS NULL OR trigger_id = ?2)
              AND (?3 IS NULL OR execution_status = ?3)
              AND (?4 IS NULL OR source = ?4)
            "#,
        )
        .bind(retention)
        .bind(&query.trigger_id)
        .bind(query.execution_status)
        .bind(query.source)
        .fetch_one(&self.pool)
        .await?;

        let events = sqlx::query_as::<_, EventLog>(
            r#"
            SELECT id, trigger_id, trigger_type, fired_at, payload, source,
                   execution_status, error_message, retention_status, is_test_run, created_at
            FROM event_logs
            WHERE retention_status = ?1
              AND (?2 IS NULL OR trigger_id = ?2)
              AND (?3 IS NULL OR execution_status = ?3)
              AND (?4 IS NULL OR source = ?4)
            ORDER BY fired_at DESC, id
            LIMIT ?5 OFFSET ?6
            "#,
        )
        .bind(retention)
        .bind(&query.trigger_id)
        .bind(query.execution_status)
        .bind(query.source)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((events, total))
    }

    async fn get_event_log(&self, id: &str) -> Result<Option<EventLog>> {
        let log = sqlx::query_as::<_, EventLog>(
            r#"
            SELECT id, trigger_id, trigger_type, fired_at, payload, source,
                   execution_status, error_message, retention_status, is_test_run, created_at
            FROM event_logs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn archive_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE event_logs
            SET retention_status = 'archived'
            WHERE retention_status = 'active' AND fired_at < ?
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM event_logs WHERE fired_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn record_idempotency(
        &self,
        job_id: &str,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO idempotency_keys (job_id, event_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(event_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_idempotency(&self, job_id: &str) -> Result<Option<String>> {
        let event_id = sqlx::query_scalar::<_, String>(
            "SELECT event_id FROM idempotency_keys WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event_id)
    }

    async fn prune_idempotency_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trigger, TriggerStatus, TriggerType};

    #[tokio::test]
    async fn from_path_creates_directories_and_migrates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tripwire.db");

        let store = SqliteStore::from_path(&path).await.unwrap();
        assert!(path.exists());

        let now = chrono::Utc::now();
        let trigger = Trigger {
            id: "tr-1".to_string(),
            name: "persisted".to_string(),
            trigger_type: TriggerType::Webhook,
            status: TriggerStatus::Active,
            config: serde_json::json!({"endpoint": "https://e", "http_method": "POST"}),
            created_at: now,
            updated_at: now,
        };
        store.create_trigger(&trigger, None).await.unwrap();

        // Reopening the same file sees the row.
        let reopened = SqliteStore::from_path(&path).await.unwrap();
        let (stored, next) = reopened.get_trigger("tr-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "persisted");
        assert_eq!(stored.trigger_type, TriggerType::Webhook);
        assert!(next.is_none());
    }
}
