// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound fire paths that are not the scheduler: webhook intake and manual
//! test runs.
//!
//! Webhook intake validates the posted body against the trigger's stored
//! JSON-Schema before anything is logged or published; a schema violation
//! leaves no trace. Test runs fire exactly one event log and one publish and
//! never create, mutate, or cancel schedule rows.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::events::EventService;
use crate::models::{EventSource, TriggerStatus, TriggerType, WebhookTriggerConfig};
use crate::store::TriggerStore;

/// Handles webhook receipts and manual test runs.
pub struct IntakeService {
    triggers: Arc<dyn TriggerStore>,
    events: Arc<EventService>,
}

impl IntakeService {
    /// Create an intake service over the trigger repository and the firing
    /// service.
    pub fn new(triggers: Arc<dyn TriggerStore>, events: Arc<EventService>) -> Self {
        Self { triggers, events }
    }

    /// Validate and fire an inbound webhook body. Returns the event id.
    pub async fn receive_webhook(&self, trigger_id: &str, payload: Value) -> Result<String> {
        let (trigger, _) = self
            .triggers
            .get_trigger(trigger_id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(trigger_id.to_string()))?;

        if trigger.trigger_type != TriggerType::Webhook {
            return Err(Error::validation(format!(
                "trigger is not a webhook type: expected 'webhook', got '{}'",
                trigger.trigger_type
            )));
        }
        if trigger.status != TriggerStatus::Active {
            return Err(Error::validation("trigger is inactive"));
        }

        // The schema comes from the stored config, never the request body.
        let config: WebhookTriggerConfig = serde_json::from_value(trigger.config.clone())?;

        if let Some(schema) = &config.schema
            && schema_is_meaningful(schema)
        {
            validate_payload(schema, &payload).inspect_err(|_| {
                warn!(trigger_id = %trigger.id, "webhook payload failed schema validation");
            })?;
        }

        let event_id = self
            .events
            .fire_trigger(&trigger, EventSource::Webhook, Some(payload), false)
            .await?;

        info!(trigger_id = %trigger.id, event_id = %event_id, "webhook accepted");
        Ok(event_id)
    }

    /// Fire a trigger once for testing. The payload is the caller-provided
    /// body, or an empty object. Returns the event id.
    pub async fn test_run(&self, trigger_id: &str, payload: Option<Value>) -> Result<String> {
        let (trigger, _) = self
            .triggers
            .get_trigger(trigger_id)
            .await?
            .ok_or_else(|| Error::TriggerNotFound(trigger_id.to_string()))?;

        let payload = payload.unwrap_or_else(|| Value::Object(Default::default()));
        self.events
            .fire_trigger(&trigger, EventSource::ManualTest, Some(payload), true)
            .await
    }
}

/// An absent, null, or empty-object schema accepts any JSON body.
fn schema_is_meaningful(schema: &Value) -> bool {
    match schema {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn validate_payload(schema: &Value, payload: &Value) -> Result<()> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| Error::Schema(e.to_string()))?;

    let violations: Vec<String> = validator.iter_errors(payload).map(|e| e.to_string()).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "payload schema validation failed: {}",
            violations.join("; ")
        )))
    }
}
