//! # Worker
//!
//! Consumer side of the protocol: the [`Worker`] loop, the injected
//! [`FunctionRegistry`] it resolves task functions in, and job fan-in
//! accounting.

pub mod completion;
pub mod registry;
pub mod runner;

pub use completion::on_subtask_complete;
pub use registry::{multiply, FunctionRegistry, MethodTable, TaskFn, TaskResult};
pub use runner::{Worker, WorkerOutcome};
