// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Platform configuration loaded from environment variables.

use std::time::Duration;

/// Runtime configuration shared by the API server and the scheduler binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Database connection pool size.
    pub db_pool_size: u32,
    /// HTTP API bind port.
    pub http_port: u16,
    /// Bus broker list.
    pub bus_brokers: Vec<String>,
    /// Topic trigger events are published to.
    pub bus_topic: String,
    /// Scheduler polling cadence.
    pub scheduler_tick: Duration,
    /// Maximum due schedules processed per tick.
    pub scheduler_batch_limit: i64,
    /// Retry ceiling before a schedule is dead-lettered as cancelled.
    pub scheduler_max_attempts: i32,
    /// Bounded deadline for a single bus publish.
    pub publish_timeout: Duration,
    /// Age after which active event logs become archived.
    pub retention_archive_age: Duration,
    /// Cadence of the archive pass.
    pub retention_archive_interval: Duration,
    /// Age (from fired_at) after which event logs are physically deleted.
    pub retention_delete_age: Duration,
    /// Cadence of the delete pass.
    pub retention_delete_interval: Duration,
    /// Age after which idempotency mappings are pruned.
    pub idempotency_ttl: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("TRIPWIRE_DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("TRIPWIRE_DATABASE_URL"))?;

        let db_pool_size = env_parse("TRIPWIRE_DB_POOL_SIZE", 10)?;
        let http_port = env_parse("TRIPWIRE_HTTP_PORT", 8080u16)?;

        let bus_brokers = std::env::var("TRIPWIRE_BUS_BROKERS")
            .unwrap_or_else(|_| "localhost:9092".to_string());
        let bus_brokers = parse_broker_list(&bus_brokers);

        let bus_topic = std::env::var("TRIPWIRE_BUS_TOPIC")
            .unwrap_or_else(|_| "trigger-events".to_string());

        Ok(Self {
            database_url,
            db_pool_size,
            http_port,
            bus_brokers,
            bus_topic,
            scheduler_tick: Duration::from_secs(env_parse("TRIPWIRE_SCHEDULER_TICK_SECS", 5u64)?),
            scheduler_batch_limit: env_parse("TRIPWIRE_SCHEDULER_BATCH_LIMIT", 100i64)?,
            scheduler_max_attempts: env_parse("TRIPWIRE_SCHEDULER_MAX_ATTEMPTS", 5i32)?,
            publish_timeout: Duration::from_secs(env_parse(
                "TRIPWIRE_PUBLISH_TIMEOUT_SECS",
                10u64,
            )?),
            retention_archive_age: Duration::from_secs(env_parse(
                "TRIPWIRE_RETENTION_ARCHIVE_AGE_SECS",
                2 * 3600u64,
            )?),
            retention_archive_interval: Duration::from_secs(env_parse(
                "TRIPWIRE_RETENTION_ARCHIVE_INTERVAL_SECS",
                300u64,
            )?),
            retention_delete_age: Duration::from_secs(env_parse(
                "TRIPWIRE_RETENTION_DELETE_AGE_SECS",
                48 * 3600u64,
            )?),
            retention_delete_interval: Duration::from_secs(env_parse(
                "TRIPWIRE_RETENTION_DELETE_INTERVAL_SECS",
                600u64,
            )?),
            idempotency_ttl: Duration::from_secs(env_parse(
                "TRIPWIRE_IDEMPOTENCY_TTL_SECS",
                7 * 24 * 3600u64,
            )?),
        })
    }
}

/// Split a comma-separated broker list, trimming whitespace around entries.
pub fn parse_broker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// An environment variable holds an unparsable value.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
