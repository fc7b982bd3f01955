//! # Error Types
//!
//! Crate-level error enum. Client-observable failures (enqueue rejected, wait
//! timed out, task function failed) are reported through entity status, so
//! `Err` values here mean an adapter or payload problem.

use crate::messaging::MessagingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskhiveError {
    #[error("Store error: {operation}: {message}")]
    Store { operation: String, message: String },

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid function reference: {reference}: {reason}")]
    InvalidFunctionRef { reference: String, reason: String },

    #[error("Function not registered: {0}")]
    FunctionNotFound(String),

    #[error("Invocation of {function} failed: {message}")]
    Invocation { function: String, message: String },

    #[error("State transition error: {0}")]
    StateTransition(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid result locator: {locator}: {reason}")]
    InvalidLocator { locator: String, reason: String },
}

impl TaskhiveError {
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_function_ref(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFunctionRef {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn invocation(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable category, recorded next to the error text on failed tasks
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store { .. } => "store_error",
            Self::Messaging(_) => "messaging_error",
            Self::Serialization(_) => "serialization_error",
            Self::Configuration(_) => "configuration_error",
            Self::InvalidFunctionRef { .. } => "invalid_function_ref",
            Self::FunctionNotFound(_) => "function_not_found",
            Self::Invocation { .. } => "invocation_error",
            Self::StateTransition(_) => "state_transition_error",
            Self::EntityNotFound(_) => "entity_not_found",
            Self::InvalidLocator { .. } => "invalid_locator",
        }
    }
}

impl From<serde_json::Error> for TaskhiveError {
    fn from(err: serde_json::Error) -> Self {
        TaskhiveError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TaskhiveError {
    fn from(err: config::ConfigError) -> Self {
        TaskhiveError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaskhiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskhiveError::store("hget", "connection refused");
        let display = format!("{err}");
        assert!(display.contains("Store error"));
        assert!(display.contains("hget"));
        assert!(display.contains("connection refused"));

        let err = TaskhiveError::FunctionNotFound("divide".to_string());
        assert_eq!(format!("{err}"), "Function not registered: divide");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TaskhiveError::invalid_function_ref("a.b.c", "too many segments").kind(),
            "invalid_function_ref"
        );
        assert_eq!(
            TaskhiveError::invocation("multiply", "boom").kind(),
            "invocation_error"
        );
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: TaskhiveError = json_err.into();
        assert!(matches!(err, TaskhiveError::Serialization(_)));
    }

    #[test]
    fn test_messaging_error_is_transparent() {
        let err: TaskhiveError = MessagingError::queue_operation("taskhive_new", "put", "full").into();
        assert!(format!("{err}").contains("taskhive_new"));
        assert_eq!(err.kind(), "messaging_error");
    }
}
