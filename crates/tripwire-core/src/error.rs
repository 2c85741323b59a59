// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for tripwire-core.
//!
//! Validation and not-found errors are expected results and recovered at the
//! edge; infrastructure errors propagate with their cause preserved.

use thiserror::Error;

/// Result type using the core Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors that can occur across the firing pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Caller-supplied input failed a documented rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced trigger does not exist.
    #[error("trigger not found: {0}")]
    TriggerNotFound(String),

    /// The referenced schedule row does not exist.
    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),

    /// A trigger's stored JSON-Schema could not be compiled.
    #[error("invalid payload schema: {0}")]
    Schema(String),

    /// Bus publication failed after the event log was written. The log row
    /// identified by `event_id` exists with `execution_status=failure`.
    #[error("publish failed for event '{event_id}': {reason}")]
    Publish {
        /// Id of the event log written before the publish attempt.
        event_id: String,
        /// Why the publish failed.
        reason: String,
    },

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration run failed.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a validation error from any printable reason.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Whether this error is a caller-input problem (400-class).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this error means the referenced entity is absent (404-class).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TriggerNotFound(_) | Self::ScheduleNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        assert!(Error::validation("run_at is required").is_validation());
        assert!(!Error::validation("x").is_not_found());
        assert!(Error::TriggerNotFound("abc".into()).is_not_found());
        assert!(Error::ScheduleNotFound("abc".into()).is_not_found());
        assert!(
            !Error::Publish {
                event_id: "e".into(),
                reason: "broker down".into()
            }
            .is_validation()
        );
    }

    #[test]
    fn display_includes_context() {
        let err = Error::Publish {
            event_id: "ev-1".into(),
            reason: "timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "publish failed for event 'ev-1': timed out"
        );

        let err = Error::TriggerNotFound("tr-1".into());
        assert_eq!(err.to_string(), "trigger not found: tr-1");
    }
}
