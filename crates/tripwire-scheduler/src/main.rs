// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Scheduler service entrypoint: wires the engine and the retention worker
//! against PostgreSQL and runs both until interrupted.

use std::sync::Arc;

use tracing::{info, warn};

use tripwire_core::Config;
use tripwire_core::clock::SystemClock;
use tripwire_core::events::EventService;
use tripwire_core::publish::LogPublisher;
use tripwire_core::store::PostgresStore;
use tripwire_scheduler::{
    RetentionWorker, RetentionWorkerConfig, SchedulerEngine, SchedulerEngineConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripwire_scheduler=info,tripwire_core=info".into()),
        )
        .init();

    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        database_url = %mask_dsn(&config.database_url),
        bus_topic = %config.bus_topic,
        tick_secs = config.scheduler_tick.as_secs(),
        "starting Tripwire scheduler"
    );

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect(&config.database_url)
        .await?;
    tripwire_core::migrations::run_postgres(&pool).await?;
    info!("database connection established");

    let store = Arc::new(PostgresStore::new(pool));
    let clock = Arc::new(SystemClock);
    let publisher = Arc::new(LogPublisher::new(&config.bus_topic));

    let events = Arc::new(
        EventService::new(store.clone(), publisher, clock.clone())
            .with_publish_timeout(config.publish_timeout),
    );

    let engine = SchedulerEngine::new(
        store.clone(),
        events,
        clock.clone(),
        SchedulerEngineConfig::from_config(&config),
    );
    let engine_shutdown = engine.shutdown_handle();

    let retention = RetentionWorker::new(
        store,
        clock,
        RetentionWorkerConfig::from_config(&config),
    );
    let retention_shutdown = retention.shutdown_handle();

    let engine_handle = tokio::spawn(async move { engine.run().await });
    let retention_handle = tokio::spawn(async move { retention.run().await });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    engine_shutdown.notify_one();
    retention_shutdown.notify_one();
    engine_handle.await?;
    retention_handle.await?;

    info!("Tripwire scheduler shut down");
    Ok(())
}

/// Mask the password portion of a DSN for logging.
fn mask_dsn(dsn: &str) -> String {
    let Some((head, tail)) = dsn.split_once('@') else {
        return dsn.to_string();
    };
    match head.rsplit_once(':') {
        Some((prefix, _password)) => format!("{prefix}:****@{tail}"),
        None => dsn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_dsn_hides_password() {
        assert_eq!(
            mask_dsn("postgres://tripwire:s3cret@db:5432/tripwire"),
            "postgres://tripwire:****@db:5432/tripwire"
        );
        assert_eq!(mask_dsn("postgres://db/tripwire"), "postgres://db/tripwire");
    }
}
