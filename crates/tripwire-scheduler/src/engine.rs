// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The scheduler engine: a single-instance polling loop that claims due
//! schedules, fires them, and performs the post-fire transitions.
//!
//! Each tick reads the due batch, claims rows one at a time with a
//! conditional update, and fires through the event service. Success completes
//! the schedule and either deactivates a one-shot trigger or enqueues the
//! next cron occurrence; failure reverts the row for retry until the attempt
//! ceiling dead-letters it as cancelled.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use tripwire_core::clock::Clock;
use tripwire_core::error::Result;
use tripwire_core::events::EventService;
use tripwire_core::models::{
    CronScheduledTriggerConfig, EventSource, ScheduleStatus, Trigger, TriggerSchedule,
    TriggerStatus, TriggerType,
};
use tripwire_core::store::TriggerStore;
use tripwire_core::{Config, cron};

/// Scheduler engine configuration.
#[derive(Debug, Clone)]
pub struct SchedulerEngineConfig {
    /// How often to poll for due schedules.
    pub tick: Duration,
    /// Maximum schedules processed per tick.
    pub batch_limit: i64,
    /// Retry ceiling: attempts at which a failing schedule is cancelled.
    pub max_attempts: i32,
}

impl Default for SchedulerEngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(5),
            batch_limit: 100,
            max_attempts: 5,
        }
    }
}

impl SchedulerEngineConfig {
    /// Extract the engine knobs from the platform configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick: config.scheduler_tick,
            batch_limit: config.scheduler_batch_limit,
            max_attempts: config.scheduler_max_attempts,
        }
    }
}

/// The polling loop driving time- and cron-based triggers.
pub struct SchedulerEngine {
    store: Arc<dyn TriggerStore>,
    events: Arc<EventService>,
    clock: Arc<dyn Clock>,
    config: SchedulerEngineConfig,
    shutdown: Arc<Notify>,
}

impl SchedulerEngine {
    /// Create an engine over the trigger repository and the firing service.
    pub fn new(
        store: Arc<dyn TriggerStore>,
        events: Arc<EventService>,
        clock: Arc<dyn Clock>,
        config: SchedulerEngineConfig,
    ) -> Self {
        Self {
            store,
            events,
            clock,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle to signal shutdown. The loop exits between iterations;
    /// an in-flight claim is completed first.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the polling loop until shutdown is signalled.
    pub async fn run(&self) {
        self.recover_orphans().await;

        info!(
            tick_secs = self.config.tick.as_secs(),
            batch_limit = self.config.batch_limit,
            max_attempts = self.config.max_attempts,
            "scheduler engine started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("scheduler engine shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.config.tick) => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "failed to process due schedules");
                    }
                }
            }
        }
    }

    /// Crash recovery: a crash between claim and completion leaves rows in
    /// `processing`. With a single active scheduler nobody else owns them, so
    /// move them back to `pending`; attempt counts stay as they were.
    pub async fn recover_orphans(&self) {
        match self.store.reset_processing_schedules(self.clock.now()).await {
            Ok(0) => {}
            Ok(count) => info!(count, "reset orphaned processing schedules to pending"),
            Err(e) => error!(error = %e, "failed to sweep orphaned schedules"),
        }
    }

    /// One poll pass: query the due batch and process each row in order.
    pub async fn tick(&self) -> Result<()> {
        let now = self.clock.now();
        let due = self.store.due_schedules(now, self.config.batch_limit).await?;

        if due.is_empty() {
            debug!("no due schedules");
            return Ok(());
        }

        info!(count = due.len(), "processing due schedules");

        let mut fired = 0usize;
        let mut failed = 0usize;

        for (schedule, trigger) in due {
            match self.process(&schedule, &trigger).await {
                Ok(true) => fired += 1,
                Ok(false) => {} // lost the claim, someone else owns the row
                Err(e) => {
                    failed += 1;
                    error!(
                        schedule_id = %schedule.id,
                        trigger_id = %trigger.id,
                        error = %e,
                        "failed to process schedule"
                    );
                }
            }
        }

        info!(fired, failed, "tick complete");
        Ok(())
    }

    /// Claim and fire a single schedule. Returns `Ok(false)` when the claim
    /// was lost, `Ok(true)` on a successful fire.
    async fn process(&self, schedule: &TriggerSchedule, trigger: &Trigger) -> Result<bool> {
        let now = self.clock.now();

        if !self.store.claim_schedule(&schedule.id, now).await? {
            debug!(schedule_id = %schedule.id, "schedule already claimed, skipping");
            return Ok(false);
        }

        let payload = fire_payload(trigger);
        let result = self
            .events
            .fire_trigger(trigger, EventSource::Scheduler, Some(payload), false)
            .await;

        match result {
            Ok(event_id) => {
                self.store
                    .update_schedule_status(&schedule.id, ScheduleStatus::Completed, self.clock.now())
                    .await?;

                info!(
                    schedule_id = %schedule.id,
                    trigger_id = %trigger.id,
                    event_id = %event_id,
                    "trigger fired"
                );

                match trigger.trigger_type {
                    TriggerType::TimeScheduled => {
                        // One-shot: done for good.
                        self.store.deactivate_trigger(&trigger.id, self.clock.now()).await?;
                        info!(trigger_id = %trigger.id, "deactivated one-shot trigger");
                    }
                    TriggerType::CronScheduled => {
                        self.enqueue_next_occurrence(trigger).await?;
                    }
                    // Webhook triggers never have schedule rows.
                    TriggerType::Webhook => {}
                }

                Ok(true)
            }
            Err(err) => {
                if schedule.attempt_count + 1 >= self.config.max_attempts {
                    warn!(
                        schedule_id = %schedule.id,
                        trigger_id = %trigger.id,
                        attempts = schedule.attempt_count,
                        "retry ceiling reached, cancelling schedule"
                    );
                    self.store
                        .update_schedule_status(
                            &schedule.id,
                            ScheduleStatus::Cancelled,
                            self.clock.now(),
                        )
                        .await?;
                } else {
                    self.store
                        .revert_schedule_to_pending(&schedule.id, self.clock.now())
                        .await?;
                }
                Err(err)
            }
        }
    }

    /// Enqueue the next cron occurrence, but only if the trigger is still
    /// active at completion; the claimed snapshot may be stale.
    async fn enqueue_next_occurrence(&self, trigger: &Trigger) -> Result<()> {
        let Some((current, _)) = self.store.get_trigger(&trigger.id).await? else {
            info!(trigger_id = %trigger.id, "trigger deleted mid-fire, not enqueuing next occurrence");
            return Ok(());
        };
        if current.status != TriggerStatus::Active {
            info!(trigger_id = %trigger.id, "trigger inactive, not enqueuing next occurrence");
            return Ok(());
        }

        let config: CronScheduledTriggerConfig = serde_json::from_value(current.config.clone())?;
        let fire_at = cron::next_fire_time(&config.cron, &config.timezone, self.clock.now())?;

        let next = TriggerSchedule::pending(&current.id, fire_at, self.clock.now());
        self.store.create_next_schedule(&next).await?;

        info!(
            trigger_id = %current.id,
            next_schedule_id = %next.id,
            next_fire_at = %fire_at,
            cron = %config.cron,
            timezone = %config.timezone,
            "enqueued next cron occurrence"
        );
        Ok(())
    }
}

/// The payload sent for a scheduled fire: the config's `payload` object when
/// present, otherwise the whole config.
fn fire_payload(trigger: &Trigger) -> Value {
    if let Some(payload) = trigger.config.get("payload")
        && payload.is_object()
    {
        return payload.clone();
    }
    trigger.config.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults() {
        let config = SchedulerEngineConfig::default();
        assert_eq!(config.tick, Duration::from_secs(5));
        assert_eq!(config.batch_limit, 100);
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn fire_payload_prefers_payload_field() {
        let mut trigger = Trigger {
            id: "t".into(),
            name: "t".into(),
            trigger_type: TriggerType::CronScheduled,
            status: TriggerStatus::Active,
            config: json!({
                "cron": "*/5 * * * *",
                "endpoint": "https://e",
                "payload": {"k": "v"}
            }),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(fire_payload(&trigger), json!({"k": "v"}));

        // Without a payload object, the whole config goes out.
        trigger.config = json!({"cron": "*/5 * * * *", "endpoint": "https://e"});
        assert_eq!(fire_payload(&trigger), trigger.config);
    }
}
