// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trigger business logic: validation, normalization, and materialization of
//! the first schedule row in the same transaction as the trigger mutation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::clock::Clock;
use crate::cron;
use crate::error::{Error, Result};
use crate::models::{
    CreateTriggerRequest, CronScheduledTriggerConfig, ListTriggersQuery, Pagination,
    TimeScheduledTriggerConfig, Trigger, TriggerListResponse, TriggerResponse, TriggerSchedule,
    TriggerStatus, TriggerType, UpdateTriggerRequest, WebhookTriggerConfig, clamp_page,
};
use crate::store::{TriggerStore, TriggerUpdate};

/// Creates, updates, lists, and deletes triggers.
pub struct TriggerService {
    store: Arc<dyn TriggerStore>,
    clock: Arc<dyn Clock>,
}

impl TriggerService {
    /// Create a trigger service over the given repository and clock.
    pub fn new(store: Arc<dyn TriggerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validate, normalize, and persist a new trigger; scheduled types also
    /// get their first `pending` schedule row in the same transaction.
    pub async fn create(&self, req: CreateTriggerRequest) -> Result<TriggerResponse> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }

        let id = Uuid::new_v4().to_string();
        let now = self.clock.now();

        let (config, schedule) = match req.trigger_type {
            TriggerType::Webhook => (normalize_webhook_config(req.config)?, None),
            TriggerType::TimeScheduled => {
                let (config, schedule) = self.prepare_time_schedule(&id, req.config, now)?;
                (config, Some(schedule))
            }
            TriggerType::CronScheduled => {
                let (config, schedule) = self.prepare_cron_schedule(&id, req.config, now)?;
                (config, Some(schedule))
            }
        };

        let trigger = Trigger {
            id: id.clone(),
            name,
            trigger_type: req.trigger_type,
            status: TriggerStatus::Active,
            config,
            created_at: now,
            updated_at: now,
        };

        self.store.create_trigger(&trigger, schedule.as_ref()).await?;

        let (stored, next) = self
            .store
            .get_trigger(&id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(id))?;
        Ok(TriggerResponse::from_parts(stored, next))
    }

    /// Fetch one trigger with its next scheduled run.
    pub async fn get(&self, id: &str) -> Result<TriggerResponse> {
        let (trigger, next) = self
            .store
            .get_trigger(id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(id.to_string()))?;
        Ok(TriggerResponse::from_parts(trigger, next))
    }

    /// List triggers matching the filter with pagination metadata.
    pub async fn list(&self, query: ListTriggersQuery) -> Result<TriggerListResponse> {
        let (page, limit) = clamp_page(query.page, query.limit);
        let (triggers, next_runs, total) = self.store.list_triggers(&query).await?;

        let responses = triggers
            .into_iter()
            .zip(next_runs)
            .map(|(trigger, next)| TriggerResponse::from_parts(trigger, next))
            .collect();

        Ok(TriggerListResponse {
            triggers: responses,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Apply a partial update. A config change re-validates against the
    /// trigger's original type (type is immutable) and replaces any still
    /// pending schedules; a bare status flip leaves schedule rows alone, the
    /// scheduler consults trigger status at claim time.
    pub async fn update(&self, id: &str, req: UpdateTriggerRequest) -> Result<TriggerResponse> {
        let (current, _) = self
            .store
            .get_trigger(id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(id.to_string()))?;

        let mut update = TriggerUpdate::default();
        let mut schedule = None;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::validation("name cannot be empty"));
            }
            update.name = Some(name);
        }

        if let Some(status) = req.status {
            update.status = Some(status);
        }

        if let Some(config) = req.config {
            let now = self.clock.now();
            match current.trigger_type {
                TriggerType::Webhook => {
                    update.config = Some(normalize_webhook_config(config)?);
                }
                TriggerType::TimeScheduled => {
                    let (config, next) = self.prepare_time_schedule(&current.id, config, now)?;
                    update.config = Some(config);
                    schedule = Some(next);
                }
                TriggerType::CronScheduled => {
                    let (config, next) = self.prepare_cron_schedule(&current.id, config, now)?;
                    update.config = Some(config);
                    schedule = Some(next);
                }
            }
        }

        if !update.is_empty() {
            self.store
                .update_trigger(id, &update, self.clock.now())
                .await?;
        }

        if let Some(schedule) = schedule {
            self.store
                .upsert_trigger_schedule(id, Some(&schedule), self.clock.now())
                .await?;
        }

        let (refreshed, next) = self
            .store
            .get_trigger(id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(id.to_string()))?;
        Ok(TriggerResponse::from_parts(refreshed, next))
    }

    /// Delete a trigger. Schedules cascade; event log history survives.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete_trigger(id).await
    }

    fn prepare_time_schedule(
        &self,
        trigger_id: &str,
        config: Value,
        now: DateTime<Utc>,
    ) -> Result<(Value, TriggerSchedule)> {
        let mut cfg: TimeScheduledTriggerConfig = serde_json::from_value(config)
            .map_err(|e| Error::validation(format!("invalid time_scheduled config: {e}")))?;

        if cfg.run_at.trim().is_empty() {
            return Err(Error::validation(
                "run_at is required for time_scheduled triggers",
            ));
        }
        if cfg.endpoint.trim().is_empty() {
            return Err(Error::validation(
                "endpoint is required for time_scheduled triggers",
            ));
        }
        cfg.http_method = normalize_method(&cfg.http_method);

        let zone = cron::resolve_timezone(&cfg.timezone)?;
        cfg.timezone = zone.name().to_string();

        let run_at = DateTime::parse_from_rfc3339(cfg.run_at.trim())
            .map_err(|e| Error::validation(format!("invalid run_at: {e}")))?
            .with_timezone(&Utc);

        if run_at < now - Duration::minutes(1) {
            return Err(Error::validation("run_at must be in the future"));
        }

        let schedule = TriggerSchedule::pending(trigger_id, run_at, now);
        Ok((serde_json::to_value(cfg)?, schedule))
    }

    fn prepare_cron_schedule(
        &self,
        trigger_id: &str,
        config: Value,
        now: DateTime<Utc>,
    ) -> Result<(Value, TriggerSchedule)> {
        let mut cfg: CronScheduledTriggerConfig = serde_json::from_value(config)
            .map_err(|e| Error::validation(format!("invalid cron_scheduled config: {e}")))?;

        if cfg.cron.trim().is_empty() {
            return Err(Error::validation("cron expression is required"));
        }
        if cfg.endpoint.trim().is_empty() {
            return Err(Error::validation(
                "endpoint is required for cron_scheduled triggers",
            ));
        }
        cfg.http_method = normalize_method(&cfg.http_method);

        let zone = cron::resolve_timezone(&cfg.timezone)?;
        cfg.timezone = zone.name().to_string();

        let fire_at = cron::next_fire_time(&cfg.cron, &cfg.timezone, now)?;
        let schedule = TriggerSchedule::pending(trigger_id, fire_at, now);
        Ok((serde_json::to_value(cfg)?, schedule))
    }
}

fn normalize_webhook_config(config: Value) -> Result<Value> {
    let mut cfg: WebhookTriggerConfig = serde_json::from_value(config)
        .map_err(|e| Error::validation(format!("invalid webhook config: {e}")))?;

    if cfg.endpoint.trim().is_empty() {
        return Err(Error::validation("endpoint is required for webhook triggers"));
    }
    cfg.http_method = normalize_method(&cfg.http_method);

    Ok(serde_json::to_value(cfg)?)
}

fn normalize_method(method: &str) -> String {
    let trimmed = method.trim();
    if trimmed.is_empty() {
        "POST".to_string()
    } else {
        trimmed.to_uppercase()
    }
}
