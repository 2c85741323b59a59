// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API server entrypoint.

use std::sync::Arc;

use tracing::{info, warn};

use tripwire_core::Config;
use tripwire_core::clock::SystemClock;
use tripwire_core::events::EventService;
use tripwire_core::intake::IntakeService;
use tripwire_core::publish::LogPublisher;
use tripwire_core::store::PostgresStore;
use tripwire_core::triggers::TriggerService;
use tripwire_server::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripwire_server=info,tripwire_core=info".into()),
        )
        .init();

    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

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
    let triggers = Arc::new(TriggerService::new(store.clone(), clock));
    let intake = Arc::new(IntakeService::new(store, events.clone()));

    let app = router(AppState {
        triggers,
        events,
        intake,
    });

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Tripwire API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    info!("Tripwire API shut down");
    Ok(())
}
