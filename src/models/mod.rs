//! # Models
//!
//! Persisted entities (task messages, jobs) and the value types they carry:
//! function references and result locators.

pub mod entity;
pub mod function_ref;
pub mod job;
pub mod result_locator;
pub mod task_message;

pub use entity::{channel_name_for, entity_key, Entity, Relation};
pub use function_ref::FunctionRef;
pub use job::{Job, JOB_TASKS};
pub use result_locator::ResultLocator;
pub use task_message::{TaskKind, TaskMessage};
