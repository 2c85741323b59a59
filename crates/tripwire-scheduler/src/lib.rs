// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tripwire Scheduler - Firing Loop and Retention
//!
//! This crate hosts the two background workers of the platform:
//!
//! - [`engine::SchedulerEngine`]: the single-instance polling loop that
//!   claims due schedules, fires them through the core event service, and
//!   performs the post-fire transitions (deactivate one-shots, enqueue the
//!   next cron occurrence, retry or dead-letter on failure).
//! - [`retention::RetentionWorker`]: the periodic job advancing event-log
//!   lifecycle states (active → archived → deleted) and pruning the
//!   idempotency mapping.
//!
//! The `tripwire-scheduler` binary wires both against PostgreSQL; the workers
//! themselves only see the repository traits, so the test suites drive them
//! against the embedded SQLite backend with compressed windows.
//!
//! # Timing
//!
//! With a tick of `T` seconds and a non-saturated batch, a schedule due at
//! instant `t` fires no later than `t + T` plus the time to claim, log, and
//! publish one event. The default 5 s tick targets at most ~10 s of observed
//! drift.

#![deny(missing_docs)]

/// The scheduler engine polling loop.
pub mod engine;

/// The event-log retention worker.
pub mod retention;

pub use engine::{SchedulerEngine, SchedulerEngineConfig};
pub use retention::{RetentionWorker, RetentionWorkerConfig};
