// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The bus publication capability.
//!
//! The platform guarantees at-least-once publication of every fired trigger;
//! the broker client itself lives behind the [`Publisher`] trait. Events are
//! keyed by trigger id so all fires of one trigger land on one partition.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{EventSource, TriggerType};

/// The message published to the bus for every fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Id of the event log row recording this fire.
    pub event_id: String,
    /// Owning trigger; absent only for test runs without a persisted trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(rename = "type")]
    /// The trigger's type.
    pub trigger_type: TriggerType,
    /// The fired payload object.
    pub payload: Value,
    /// Wall-clock instant of the fire, UTC.
    pub fired_at: DateTime<Utc>,
    /// Which path fired the event.
    pub source: EventSource,
}

impl TriggerEvent {
    /// The bus partitioning key: the trigger id, or the event id for trigger-less
    /// test runs.
    pub fn key(&self) -> &str {
        self.trigger_id.as_deref().unwrap_or(&self.event_id)
    }
}

/// Capability that accepts a fully-formed event and emits it to the bus.
///
/// `publish` returns only after the event has been accepted with full
/// durability; any error is surfaced to the caller.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Emit one event to the bus.
    async fn publish(&self, event: &TriggerEvent) -> Result<()>;
}

/// Publisher that emits events as structured log lines.
///
/// Stand-in wiring point for a broker client: a real bus integration
/// implements [`Publisher`] with the same message shape and replaces this in
/// the binaries' wiring.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    topic: String,
}

impl LogPublisher {
    /// Create a publisher that logs to `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, event: &TriggerEvent) -> Result<()> {
        let body = serde_json::to_string(event)?;
        info!(
            topic = %self.topic,
            key = %event.key(),
            event = %body,
            "published trigger event"
        );
        Ok(())
    }
}

/// In-memory publisher that captures events and can simulate failures.
/// Used by the test suites and embedded setups.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<TriggerEvent>>,
    fail_next: AtomicBool,
    fail_always: AtomicBool,
}

impl MemoryPublisher {
    /// Create an empty capture publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail exactly the next publish attempt.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Fail every publish attempt until cleared.
    pub fn set_fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<TriggerEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, event: &TriggerEvent) -> Result<()> {
        if self.fail_always.load(Ordering::SeqCst) || self.fail_next.swap(false, Ordering::SeqCst)
        {
            return Err(Error::Publish {
                event_id: event.event_id.clone(),
                reason: "publish failed".to_string(),
            });
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
