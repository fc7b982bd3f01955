#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskhive
//!
//! Distributed task and job execution over a shared message queue and a
//! key-value entity store.
//!
//! ## Overview
//!
//! Clients submit units of work ("tasks") and groups of related work ("jobs")
//! onto a queue. Independent workers reserve tasks, invoke the referenced
//! function, persist the result and signal completion back to waiting callers
//! and to parent jobs. Nothing is shared in memory between producers and
//! workers: all coordination goes through the queue and the store.
//!
//! ## Lifecycle
//!
//! - A task is created `new`, persisted, then enqueued (`queued`, or
//!   `notqueued` after one failed retry).
//! - A worker marks it `running`, invokes it, stores the result and marks it
//!   `done` with a result locator; failures end in `unknown` with an `error`.
//! - A job freezes its `task_count` when its subtasks are enqueued and becomes
//!   `done` exactly when the atomic `completed_task_count` reaches it.
//! - Callers wait on handles by polling the store or, when the entity was
//!   created with `notify`, by listening on the entity's own channel.
//!
//! ## Module Organization
//!
//! - [`client`] - `Client`, `TaskHandle`, `JobHandle`
//! - [`worker`] - `Worker` loop, `FunctionRegistry`, job fan-in
//! - [`wait`] - result wait protocol and poll schedule
//! - [`models`] - task messages, jobs, entity mapping, locators
//! - [`messaging`] - queue adapter, sessions, in-memory queue
//! - [`store`] - entity and result store adapters
//! - [`state_machine`] - status vocabulary and transitions
//! - [`config`] / [`logging`] / [`error`] - ambient concerns
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taskhive::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> taskhive::Result<()> {
//! let ctx = HiveContext::in_memory(TaskhiveConfig::default())?;
//!
//! let registry = Arc::new(FunctionRegistry::new());
//! registry.register_sync("multiply", multiply);
//! let mut worker = Worker::new(ctx.clone(), registry);
//!
//! let client = Client::new(ctx);
//! let mut task = client
//!     .submit_task("multiply", vec![json!(4), json!(5), json!(6)], TaskOptions::default())
//!     .await?;
//! worker.process_next(Some(Duration::ZERO)).await?;
//! assert_eq!(task.value(Some(Duration::ZERO)).await?, Some(json!(120)));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod state_machine;
pub mod store;
pub mod wait;
pub mod worker;

pub use client::{Client, JobHandle, TaskHandle, TaskOptions};
pub use config::TaskhiveConfig;
pub use context::HiveContext;
pub use error::{Result, TaskhiveError};
pub use models::{FunctionRef, Job, ResultLocator, TaskMessage};
pub use state_machine::{TaskEvent, TaskStatus};
pub use worker::{FunctionRegistry, MethodTable, Worker, WorkerOutcome};

/// Common imports for applications embedding clients and workers
pub mod prelude {
    pub use crate::client::{Client, JobHandle, TaskHandle, TaskOptions};
    pub use crate::config::TaskhiveConfig;
    pub use crate::context::HiveContext;
    pub use crate::error::{Result, TaskhiveError};
    pub use crate::state_machine::TaskStatus;
    pub use crate::worker::{multiply, FunctionRegistry, MethodTable, Worker, WorkerOutcome};
}
