// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain entities for triggers, schedules, and event logs, plus the typed
//! request/response shapes the services exchange.
//!
//! Statuses are stored as TEXT in both database backends; the enums carry a
//! database-generic TEXT codec so the same record structs work on PostgreSQL
//! and SQLite.

#![allow(missing_docs)] // Enum variants and DTO fields mirror the wire names.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Implement the TEXT codec for a status enum: `as_str`/`Display`/`FromStr`
/// plus database-generic sqlx impls so the same type binds and decodes as
/// TEXT on both PostgreSQL and SQLite.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Stable wire name of the variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($ty), " value: {}"),
                        other
                    )),
                }
            }
        }

        impl<DB: sqlx::Database> sqlx::Type<DB> for $ty
        where
            String: sqlx::Type<DB>,
        {
            fn type_info() -> DB::TypeInfo {
                <String as sqlx::Type<DB>>::type_info()
            }

            fn compatible(ty: &DB::TypeInfo) -> bool {
                <String as sqlx::Type<DB>>::compatible(ty)
            }
        }

        impl<'q, DB: sqlx::Database> sqlx::Encode<'q, DB> for $ty
        where
            &'q str: sqlx::Encode<'q, DB>,
        {
            fn encode_by_ref(
                &self,
                buf: &mut DB::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, DB>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r, DB: sqlx::Database> sqlx::Decode<'r, DB> for $ty
        where
            String: sqlx::Decode<'r, DB>,
        {
            fn decode(value: DB::ValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <String as sqlx::Decode<'r, DB>>::decode(value)?;
                raw.parse().map_err(|e: String| e.into())
            }
        }
    };
}

/// The kind of trigger: externally posted, one-shot, or recurring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Webhook,
    TimeScheduled,
    CronScheduled,
}

text_enum!(TriggerType {
    Webhook => "webhook",
    TimeScheduled => "time_scheduled",
    CronScheduled => "cron_scheduled",
});

/// Whether a trigger is eligible to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Active,
    Inactive,
}

text_enum!(TriggerStatus {
    Active => "active",
    Inactive => "inactive",
});

/// Processing state of a queued occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

text_enum!(ScheduleStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Which path fired an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Webhook,
    Scheduler,
    #[serde(rename = "manual-test")]
    ManualTest,
}

text_enum!(EventSource {
    Webhook => "webhook",
    Scheduler => "scheduler",
    ManualTest => "manual-test",
});

/// Platform-level outcome of a fire: did the publish go through?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
}

text_enum!(ExecutionStatus {
    Success => "success",
    Failure => "failure",
});

/// Retention lifecycle state of an event log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionStatus {
    Active,
    Archived,
    Deleted,
}

text_enum!(RetentionStatus {
    Active => "active",
    Archived => "archived",
    Deleted => "deleted",
});

/// A user-registered trigger definition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub status: TriggerStatus,
    /// Normalized configuration; shape depends on `trigger_type`.
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single queued occurrence of a scheduled trigger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TriggerSchedule {
    pub id: String,
    pub trigger_id: String,
    pub fire_at: DateTime<Utc>,
    pub status: ScheduleStatus,
    pub attempt_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TriggerSchedule {
    /// Build a fresh `pending` occurrence for `trigger_id` at `fire_at`.
    pub fn pending(trigger_id: &str, fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trigger_id: trigger_id.to_string(),
            fire_at,
            status: ScheduleStatus::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The immutable record of a single fire attempt. Append-only except for the
/// execution-status patch on publish failure and the retention transitions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventLog {
    pub id: String,
    /// Null for test runs without a persisted trigger, and after the owning
    /// trigger is deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    pub trigger_type: TriggerType,
    /// Wall-clock at firing, not the scheduled instant.
    pub fired_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub source: EventSource,
    pub execution_status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retention_status: RetentionStatus,
    pub is_test_run: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Trigger configuration shapes (validated and normalized on write)
// ---------------------------------------------------------------------------

/// Configuration for webhook triggers that fire on inbound HTTP calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookTriggerConfig {
    /// Optional JSON-Schema used to validate inbound payloads, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Downstream consumers' reference endpoint; never dialed by the platform.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// Configuration for one-shot triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeScheduledTriggerConfig {
    /// RFC 3339 timestamp of the single firing.
    #[serde(default)]
    pub run_at: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// IANA zone name; canonicalized on write, UTC when omitted.
    #[serde(default)]
    pub timezone: String,
}

/// Configuration for recurring cron triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CronScheduledTriggerConfig {
    /// 5-field cron expression, optionally 6-field with leading seconds.
    #[serde(default)]
    pub cron: String,
    /// IANA zone name; canonicalized on write, UTC when omitted.
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub http_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

// ---------------------------------------------------------------------------
// Requests, filters, responses
// ---------------------------------------------------------------------------

/// Request to create a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTriggerRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub config: Value,
}

/// Request to update a trigger; only non-nil fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTriggerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TriggerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

/// Query parameters for listing triggers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTriggersQuery {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TriggerStatus>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Query parameters for listing event logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEventsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_status: Option<RetentionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<ExecutionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Clamp a raw (page, limit) pair to the documented bounds: page >= 1 and
/// 1 <= limit <= 100, defaulting to 20 rows per page.
pub fn clamp_page(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = match limit {
        Some(l) if l >= 1 => l.min(100),
        _ => 20,
    };
    (page, limit)
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total_records: i64,
}

impl Pagination {
    /// Build pagination metadata for a clamped page/limit and a total count.
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if total > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            current_page: page,
            page_size: limit,
            total_pages,
            total_records: total,
        }
    }
}

/// A trigger as returned to callers, with its next scheduled run and, for
/// webhook triggers, the generated receiver URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    pub status: TriggerStatus,
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_scheduled_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TriggerResponse {
    /// Assemble a response from a stored trigger and its next fire hint.
    pub fn from_parts(trigger: Trigger, next: Option<DateTime<Utc>>) -> Self {
        Self {
            id: trigger.id,
            name: trigger.name,
            trigger_type: trigger.trigger_type,
            status: trigger.status,
            config: trigger.config,
            next_scheduled_run: next,
            webhook_url: None,
            created_at: trigger.created_at,
            updated_at: trigger.updated_at,
        }
    }
}

/// Paginated trigger listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerListResponse {
    pub triggers: Vec<TriggerResponse>,
    pub pagination: Pagination,
}

/// Paginated event log listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogListResponse {
    pub events: Vec<EventLog>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enums_serialize_to_wire_names() {
        assert_eq!(
            serde_json::to_value(TriggerType::TimeScheduled).unwrap(),
            json!("time_scheduled")
        );
        assert_eq!(
            serde_json::to_value(EventSource::ManualTest).unwrap(),
            json!("manual-test")
        );
        assert_eq!(
            serde_json::to_value(RetentionStatus::Archived).unwrap(),
            json!("archived")
        );
        assert_eq!(TriggerType::CronScheduled.to_string(), "cron_scheduled");
        assert_eq!(EventSource::ManualTest.to_string(), "manual-test");
    }

    #[test]
    fn enums_parse_from_wire_names() {
        assert_eq!(
            "time_scheduled".parse::<TriggerType>().unwrap(),
            TriggerType::TimeScheduled
        );
        assert_eq!(
            "manual-test".parse::<EventSource>().unwrap(),
            EventSource::ManualTest
        );
        assert!("paused".parse::<TriggerStatus>().is_err());
    }

    #[test]
    fn webhook_config_rejects_unknown_fields() {
        let raw = json!({"endpoint": "https://example.com/hook", "surprise": true});
        let parsed: Result<WebhookTriggerConfig, _> = serde_json::from_value(raw);
        assert!(parsed.is_err());
    }

    #[test]
    fn webhook_config_defaults_are_empty() {
        let raw = json!({"endpoint": "https://example.com/hook"});
        let parsed: WebhookTriggerConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.endpoint, "https://example.com/hook");
        assert!(parsed.http_method.is_empty());
        assert!(parsed.schema.is_none());
        assert!(parsed.headers.is_none());
    }

    #[test]
    fn pagination_math() {
        assert_eq!(Pagination::new(1, 2, 5).total_pages, 3);
        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
        assert_eq!(Pagination::new(2, 10, 20).total_pages, 2);
    }

    #[test]
    fn page_clamping() {
        assert_eq!(clamp_page(None, None), (1, 20));
        assert_eq!(clamp_page(Some(0), Some(0)), (1, 20));
        assert_eq!(clamp_page(Some(3), Some(500)), (3, 100));
        assert_eq!(clamp_page(Some(-1), Some(50)), (1, 50));
    }

    #[test]
    fn trigger_serializes_type_field() {
        let trigger = Trigger {
            id: "t-1".into(),
            name: "demo".into(),
            trigger_type: TriggerType::Webhook,
            status: TriggerStatus::Active,
            config: json!({"endpoint": "https://e", "http_method": "POST"}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&trigger).unwrap();
        assert_eq!(value["type"], json!("webhook"));
        assert!(value.get("trigger_type").is_none());
    }
}
