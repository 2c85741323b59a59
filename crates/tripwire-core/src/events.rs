// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The event firing service: the single funnel every fire passes through.
//!
//! A fire writes the event log first, then publishes to the bus, then patches
//! the log's execution status if the publish failed. This ordering gives
//! at-least-once publication with a post-facto failure record; the scheduler
//! layers retry on top, the webhook path surfaces the error to the caller,
//! and test runs are never retried.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{
    EventLog, EventSource, ExecutionStatus, ListEventsQuery, Pagination, RetentionStatus,
    Trigger, clamp_page,
};
use crate::publish::{Publisher, TriggerEvent};
use crate::store::EventLogStore;

const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Couples the durable event log with bus publication.
pub struct EventService {
    store: Arc<dyn EventLogStore>,
    publisher: Arc<dyn Publisher>,
    clock: Arc<dyn Clock>,
    publish_timeout: Duration,
}

impl EventService {
    /// Create a firing service with the default 10 s publish deadline.
    pub fn new(
        store: Arc<dyn EventLogStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    /// Override the bounded publish deadline.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Fire a trigger: record the event log, publish, and patch the log on
    /// publish failure. Returns the event id; a publish failure returns
    /// [`Error::Publish`] carrying the same id, and the failure-marked log
    /// row remains queryable.
    pub async fn fire_trigger(
        &self,
        trigger: &Trigger,
        source: EventSource,
        payload: Option<Value>,
        is_test_run: bool,
    ) -> Result<String> {
        let event_id = Uuid::new_v4().to_string();
        let now = self.clock.now();

        // Test harnesses may fire a trigger that was never persisted.
        let trigger_id = if trigger.id.is_empty() {
            None
        } else {
            Some(trigger.id.clone())
        };

        let log = EventLog {
            id: event_id.clone(),
            trigger_id: trigger_id.clone(),
            trigger_type: trigger.trigger_type,
            fired_at: now,
            payload: payload.clone(),
            source,
            execution_status: ExecutionStatus::Success,
            error_message: None,
            retention_status: RetentionStatus::Active,
            is_test_run,
            created_at: now,
        };

        self.store.create_event_log(&log).await?;

        let event = TriggerEvent {
            event_id: event_id.clone(),
            trigger_id,
            trigger_type: trigger.trigger_type,
            payload: payload.unwrap_or_else(|| Value::Object(Default::default())),
            fired_at: now,
            source,
        };

        let publish_result = match tokio::time::timeout(
            self.publish_timeout,
            self.publisher.publish(&event),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Publish {
                event_id: event_id.clone(),
                reason: format!(
                    "publish timed out after {} s",
                    self.publish_timeout.as_secs()
                ),
            }),
        };

        if let Err(err) = publish_result {
            let reason = match &err {
                Error::Publish { reason, .. } => reason.clone(),
                other => other.to_string(),
            };
            let message = format!("bus publish failed: {reason}");

            if let Err(update_err) = self
                .store
                .update_event_log_status(&event_id, ExecutionStatus::Failure, Some(&message))
                .await
            {
                error!(
                    event_id = %event_id,
                    error = %update_err,
                    "failed to patch event log after publish failure"
                );
            }

            error!(
                event_id = %event_id,
                trigger_id = %trigger.id,
                source = %source,
                reason = %reason,
                "publish failed, event log marked as failure"
            );
            return Err(Error::Publish { event_id, reason });
        }

        info!(
            event_id = %event_id,
            trigger_id = %trigger.id,
            trigger_type = %trigger.trigger_type,
            source = %source,
            is_test_run,
            "trigger fired"
        );
        Ok(event_id)
    }

    /// List event logs with filtering and pagination.
    pub async fn query_events(
        &self,
        query: &ListEventsQuery,
    ) -> Result<(Vec<EventLog>, Pagination)> {
        let (page, limit) = clamp_page(query.page, query.limit);
        let (events, total) = self.store.list_event_logs(query).await?;
        Ok((events, Pagination::new(page, limit, total)))
    }

    /// Fetch a single event log; `None` when absent.
    pub async fn get_event(&self, id: &str) -> Result<Option<EventLog>> {
        self.store.get_event_log(id).await
    }
}
