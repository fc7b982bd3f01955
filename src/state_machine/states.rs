use crate::error::{Result, TaskhiveError};
use crate::state_machine::events::TaskEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of task messages and jobs
///
/// Jobs only ever use `New` and `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    /// Created, not yet handed to the queue
    #[default]
    #[serde(rename = "new")]
    New,
    /// Accepted by the queue
    #[serde(rename = "queued")]
    Queued,
    /// Queue rejected both enqueue attempts
    #[serde(rename = "notqueued")]
    NotQueued,
    /// Reserved by a worker and executing
    #[serde(rename = "running")]
    Running,
    /// Result persisted
    #[serde(rename = "done")]
    Complete,
    /// Execution failed; the entity's `error` field says why
    #[serde(rename = "unknown")]
    Unknown,
}

impl TaskStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Unknown)
    }

    /// Persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Queued => "queued",
            Self::NotQueued => "notqueued",
            Self::Running => "running",
            Self::Complete => "done",
            Self::Unknown => "unknown",
        }
    }

    /// Apply `event`, returning the target status or an error for an illegal transition
    pub fn transition(self, event: &TaskEvent) -> Result<TaskStatus> {
        let target = match (self, event) {
            (TaskStatus::New, TaskEvent::Enqueue) => TaskStatus::Queued,
            (TaskStatus::New | TaskStatus::Queued, TaskEvent::EnqueueFailed) => {
                TaskStatus::NotQueued
            }
            (TaskStatus::NotQueued, TaskEvent::Enqueue) => TaskStatus::Queued,
            // a redelivered message may be reserved again after a crashed run
            (TaskStatus::New | TaskStatus::Queued | TaskStatus::Running, TaskEvent::Start) => {
                TaskStatus::Running
            }
            (TaskStatus::Running, TaskEvent::Complete) => TaskStatus::Complete,
            (TaskStatus::New | TaskStatus::Queued | TaskStatus::Running, TaskEvent::Fail(_)) => {
                TaskStatus::Unknown
            }
            _ => {
                return Err(TaskhiveError::StateTransition(format!(
                    "cannot apply '{}' to status '{}'",
                    event.event_type(),
                    self
                )))
            }
        };
        Ok(target)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = TaskhiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(Self::New),
            "queued" => Ok(Self::Queued),
            "notqueued" => Ok(Self::NotQueued),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Complete),
            "unknown" => Ok(Self::Unknown),
            _ => Err(TaskhiveError::StateTransition(format!(
                "Invalid task status: {s}"
            ))),
        }
    }
}
