// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker advancing event-log retention states by age.
//!
//! Two independent cadences: an archive pass moves active rows past the
//! archive age to `archived`, and a delete pass physically removes rows whose
//! `fired_at` is past the delete age, however long they spent archived. The
//! delete pass also prunes expired idempotency mappings.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use tripwire_core::Config;
use tripwire_core::clock::Clock;
use tripwire_core::error::Result;
use tripwire_core::store::EventLogStore;

/// Configuration for the retention worker. Tests use compressed windows.
#[derive(Debug, Clone)]
pub struct RetentionWorkerConfig {
    /// How often the archive pass runs.
    pub archive_interval: Duration,
    /// Age past which active rows are archived.
    pub archive_age: Duration,
    /// How often the delete pass runs.
    pub delete_interval: Duration,
    /// Age (from `fired_at`) past which rows are physically deleted.
    pub delete_age: Duration,
    /// Age past which idempotency mappings are pruned.
    pub idempotency_ttl: Duration,
}

impl Default for RetentionWorkerConfig {
    fn default() -> Self {
        Self {
            archive_interval: Duration::from_secs(300),
            archive_age: Duration::from_secs(2 * 3600),
            delete_interval: Duration::from_secs(600),
            delete_age: Duration::from_secs(48 * 3600),
            idempotency_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl RetentionWorkerConfig {
    /// Extract the retention knobs from the platform configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            archive_interval: config.retention_archive_interval,
            archive_age: config.retention_archive_age,
            delete_interval: config.retention_delete_interval,
            delete_age: config.retention_delete_age,
            idempotency_ttl: config.idempotency_ttl,
        }
    }
}

/// Background worker that advances event-log lifecycle states.
pub struct RetentionWorker {
    store: Arc<dyn EventLogStore>,
    clock: Arc<dyn Clock>,
    config: RetentionWorkerConfig,
    shutdown: Arc<Notify>,
}

impl RetentionWorker {
    /// Create a retention worker over the event log repository.
    pub fn new(
        store: Arc<dyn EventLogStore>,
        clock: Arc<dyn Clock>,
        config: RetentionWorkerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run both retention cadences until shutdown is signalled.
    pub async fn run(&self) {
        info!(
            archive_interval_secs = self.config.archive_interval.as_secs(),
            archive_age_secs = self.config.archive_age.as_secs(),
            delete_interval_secs = self.config.delete_interval.as_secs(),
            delete_age_secs = self.config.delete_age.as_secs(),
            "retention worker started"
        );

        let start = tokio::time::Instant::now();
        let mut archive_tick = tokio::time::interval_at(
            start + self.config.archive_interval,
            self.config.archive_interval,
        );
        let mut delete_tick = tokio::time::interval_at(
            start + self.config.delete_interval,
            self.config.delete_interval,
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("retention worker shutting down");
                    break;
                }
                _ = archive_tick.tick() => {
                    if let Err(e) = self.archive_pass().await {
                        error!(error = %e, "archive pass failed");
                    }
                }
                _ = delete_tick.tick() => {
                    if let Err(e) = self.delete_pass().await {
                        error!(error = %e, "delete pass failed");
                    }
                }
            }
        }
    }

    /// Archive active event logs older than the archive age. Returns rows moved.
    pub async fn archive_pass(&self) -> Result<u64> {
        let cutoff = self.cutoff(self.config.archive_age);
        let archived = self.store.archive_older_than(cutoff).await?;
        if archived > 0 {
            info!(archived, cutoff = %cutoff, "archived event logs");
        } else {
            debug!(cutoff = %cutoff, "archive pass found nothing to move");
        }
        Ok(archived)
    }

    /// Delete event logs fired before the delete age and prune expired
    /// idempotency mappings. Returns rows deleted.
    pub async fn delete_pass(&self) -> Result<u64> {
        let cutoff = self.cutoff(self.config.delete_age);
        let deleted = self.store.delete_older_than(cutoff).await?;
        if deleted > 0 {
            info!(deleted, cutoff = %cutoff, "deleted expired event logs");
        } else {
            debug!(cutoff = %cutoff, "delete pass found nothing to remove");
        }

        let idempotency_cutoff = self.cutoff(self.config.idempotency_ttl);
        let pruned = self
            .store
            .prune_idempotency_older_than(idempotency_cutoff)
            .await?;
        if pruned > 0 {
            info!(pruned, "pruned idempotency mappings");
        }

        Ok(deleted)
    }

    fn cutoff(&self, age: Duration) -> DateTime<Utc> {
        self.clock.now() - chrono::Duration::seconds(age.as_secs() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_documented_windows() {
        let config = RetentionWorkerConfig::default();
        assert_eq!(config.archive_interval, Duration::from_secs(300));
        assert_eq!(config.archive_age, Duration::from_secs(7200));
        assert_eq!(config.delete_interval, Duration::from_secs(600));
        assert_eq!(config.delete_age, Duration::from_secs(172_800));
        assert_eq!(config.idempotency_ttl, Duration::from_secs(604_800));
    }
}
