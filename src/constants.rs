//! # System Constants
//!
//! Well-known channel names, entity type names and persisted field names shared
//! by clients, workers and waiters. Every process must agree on these values.

/// Queue channels with fixed, well-known names
pub mod channels {
    /// Intake channel every worker watches for new task messages
    pub const NEW_TASK: &str = "taskhive_new";
    /// Receives bodies of tasks that could not be executed
    pub const DEAD_LETTER: &str = "taskhive_dead";
}

/// Entity type names, used as the first segment of store keys
pub mod entity_types {
    pub const SIMPLE_TASK: &str = "SimpleTask";
    pub const JOB_TASK: &str = "JobTask";
    pub const JOB: &str = "Job";
}

/// Persisted field names
pub mod fields {
    pub const TYPE: &str = "type";
    pub const FN: &str = "fn";
    pub const ARGS: &str = "args";
    pub const CALLBACK: &str = "callback";
    pub const NOTIFY: &str = "notify";
    pub const STATUS: &str = "status";
    pub const RESULT_LOCATOR: &str = "result_locator";
    pub const ERROR: &str = "error";
    pub const JOB_ID: &str = "job_id";
    pub const TASK_COUNT: &str = "task_count";
    pub const COMPLETED_TASK_COUNT: &str = "completed_task_count";
    /// Incremented by whoever completes a job; only the first claimant proceeds
    pub const COMPLETION_CLAIMS: &str = "completion_claims";
}

/// Relation names
pub mod relations {
    /// Job has-many JobTask, reverse of `JobTask.job_id`
    pub const JOB_TASKS: &str = "tasks";
}

/// Message type discriminators carried in every queue body
pub mod message_types {
    pub const SIMPLE_TASK: &str = "task";
    pub const JOB_TASK: &str = "jobtask";
    pub const JOB: &str = "job";
}

/// Sentinel published on a job's notification channel when it completes
pub const JOB_COMPLETE_MARKER: &str = "complete";
