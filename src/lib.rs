//! # Prometheus Build Orchestrator
//!
//! Admission control for long-running, resumable AI build units.
//!
//! A build is a set of [`WorkUnit`](core::WorkUnit)s joined by dependency edges.
//! Each unit has a size measured in abstract cost units (tokens, in practice),
//! and the agents that execute units degrade once a unit grows past a budget.
//! The orchestrator decides which unit may run, when, and whether it must be
//! split first.
//!
//! ## Core Pieces
//!
//! - **DependencyGraph**: acyclic, level-ordered graph of units with a
//!   deterministic dependency-first build order.
//! - **BudgetTracker**: classifies sizes into green/yellow/orange/red tiers and
//!   gates admission on `current + cost + margin <= hard_limit`. Red units are
//!   never scheduled until split.
//! - **CheckpointStore**: append-only partial-progress snapshots, so a suspended
//!   unit resumes instead of starting over.
//! - **Scheduler**: single-writer state machine that admits at most
//!   `concurrency_limit` units at once, queues the rest by priority, retries
//!   failures, and promotes queued work as slots free up.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_build_orchestrator::builders::SchedulerBuilder;
//! use prometheus_build_orchestrator::config::OrchestratorConfig;
//! use prometheus_build_orchestrator::core::{LaunchTask, UnitLevel, WorkUnit};
//! use prometheus_build_orchestrator::runtime::{Dispatcher, TokioSpawner};
//!
//! let scheduler = Arc::new(SchedulerBuilder::new(OrchestratorConfig::from_env()?).build()?);
//! scheduler.add_unit(WorkUnit::new("db", UnitLevel::Base, 12_000))?;
//! scheduler.add_unit(WorkUnit::new("api", UnitLevel::Core, 30_000).with_dependencies(["db"]))?;
//! scheduler.preflight()?;
//!
//! let (dispatcher, events) = Dispatcher::new(scheduler.clone(), my_executor, TokioSpawner::current()?);
//! dispatcher.launch("db", LaunchTask::new("create schema", 8_000), 0).await?;
//! dispatcher.run(events, shutdown_signal).await;
//! ```
//!
//! See `tests/scheduler_test.rs` for end-to-end scheduling scenarios.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Units, graph, budgets, checkpoints, and the scheduler.
pub mod core;
/// Configuration models for limits, budgets, and storage.
pub mod config;
/// Builders to construct a scheduler from configuration.
pub mod builders;
/// Storage adapters for checkpoints and the unit registry.
pub mod infra;
/// Tokio dispatch loop and API surface.
#[cfg(feature = "tokio-runtime")]
pub mod runtime;
/// Shared utilities.
pub mod util;
