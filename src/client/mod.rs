//! # Client
//!
//! Producer side of the protocol: [`Client`] submits tasks and creates jobs;
//! [`TaskHandle`] and [`JobHandle`] are what a caller holds to inspect status and
//! wait for results.
//!
//! ```rust,no_run
//! use taskhive::client::{Client, TaskOptions};
//! use taskhive::config::TaskhiveConfig;
//! use taskhive::context::HiveContext;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # async fn example() -> taskhive::Result<()> {
//! let client = Client::new(HiveContext::in_memory(TaskhiveConfig::default())?);
//! let mut task = client
//!     .submit_task("multiply", vec![json!(4), json!(5), json!(6)], TaskOptions::default())
//!     .await?;
//! let value = task.value(Some(Duration::from_secs(10))).await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod hive_client;
pub mod job_handle;
pub mod task_handle;

pub use hive_client::{Client, TaskOptions};
pub use job_handle::JobHandle;
pub use task_handle::TaskHandle;
