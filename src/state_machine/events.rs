use serde::{Deserialize, Serialize};

/// Events that drive task status transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// The queue accepted the message
    Enqueue,
    /// The queue rejected every enqueue attempt
    EnqueueFailed,
    /// A worker reserved the message
    Start,
    /// The result was persisted
    Complete,
    /// Resolution or invocation failed
    Fail(String),
}

impl TaskEvent {
    /// Short name used in transition errors and logs
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Enqueue => "enqueue",
            Self::EnqueueFailed => "enqueue_failed",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
        }
    }

    /// The failure reason carried by `Fail`
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}
