// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tripwire Core - Event Trigger Platform
//!
//! This crate provides the firing pipeline of the Tripwire platform: the
//! trigger and schedule data model, validation and normalization, the event
//! firing service that couples durable logging with bus publication, the
//! repositories, and the cron/clock utilities the scheduler builds on.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          External Callers                                │
//! │                  (HTTP API, webhook posters, operators)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//!            │ CRUD / test                 │ webhook body
//!            ▼                             ▼
//! ┌───────────────────────┐     ┌───────────────────────┐
//! │    TriggerService     │     │     IntakeService     │
//! │  validate + normalize │     │  schema-check + fire  │
//! └──────────┬────────────┘     └──────────┬────────────┘
//!            │                             │
//!            │        ┌────────────────────┘
//!            ▼        ▼
//! ┌───────────────────────┐     ┌───────────────────────┐
//! │     TriggerStore      │     │     EventService      │──▶ Publisher ──▶ bus
//! │ triggers + schedules  │     │ event log + publish   │
//! └──────────┬────────────┘     └──────────┬────────────┘
//!            │                             │
//!            ▼                             ▼
//! ┌─────────────────────────────────────────────────────┐
//! │              PostgreSQL / SQLite (sqlx)             │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler engine and the retention worker live in the
//! `tripwire-scheduler` crate and drive this pipeline through the same
//! repository traits.
//!
//! # Fire semantics
//!
//! Every fire — scheduler, webhook, or manual test — passes through
//! [`events::EventService::fire_trigger`]:
//!
//! 1. Write an event log row with `execution_status=success`.
//! 2. Publish the bus event under a bounded deadline.
//! 3. On publish failure, patch the log to `execution_status=failure` and
//!    return the error together with the event id.
//!
//! This is at-least-once publication with a durable failure record.
//!
//! # Schedule state machine
//!
//! ```text
//! pending ──claim──▶ processing ──publish ok──▶ completed
//!    ▲                    │
//!    │                    ├── publish fail, attempts < M ──▶ (back to pending)
//!    │                    │
//!    └────────────────────┴── publish fail, attempts ≥ M ──▶ cancelled
//!
//! superseded by config update: any pending/processing ──▶ cancelled
//! ```
//!
//! # Configuration
//!
//! Loaded from environment variables by [`config::Config::from_env`]; see the
//! field docs for the full knob list (`TRIPWIRE_DATABASE_URL` is the only
//! required variable).
//!
//! # Modules
//!
//! - [`clock`]: injectable current-time source
//! - [`config`]: environment configuration
//! - [`cron`]: next-occurrence evaluation for cron expressions
//! - [`error`]: error types and classification
//! - [`events`]: the event firing service
//! - [`intake`]: webhook intake and manual test runs
//! - [`migrations`]: embedded database migrations
//! - [`models`]: domain entities and request/response shapes
//! - [`publish`]: the bus publisher capability
//! - [`store`]: repository traits and backends
//! - [`triggers`]: trigger CRUD and schedule materialization

#![deny(missing_docs)]

/// Injectable current-time source for deterministic schedule math.
pub mod clock;

/// Platform configuration from environment variables.
pub mod config;

/// Pure cron evaluation utilities.
pub mod cron;

/// Error types for core operations.
pub mod error;

/// The event firing service.
pub mod events;

/// Webhook intake and manual test runs.
pub mod intake;

/// Embedded database migrations.
pub mod migrations;

/// Domain entities and request/response shapes.
pub mod models;

/// The bus publisher capability and bundled implementations.
pub mod publish;

/// Repository traits and the PostgreSQL/SQLite backends.
pub mod store;

/// Trigger CRUD and schedule materialization.
pub mod triggers;

pub use config::Config;
pub use error::{Error, Result};
