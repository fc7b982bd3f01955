//! # Queue Errors
//!
//! Failures a queue adapter can report. Callers on the enqueue path never see
//! these directly: `enqueue_with_retry` folds them into an `Option`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    /// The backend refused or failed an operation on `channel`
    #[error("Queue {operation} on {channel} failed: {message}")]
    QueueOperation {
        channel: String,
        operation: String,
        message: String,
    },

    #[error("Invalid channel name '{channel}': {reason}")]
    InvalidChannelName { channel: String, reason: String },

    #[error("Reserve called on a session that watches no channels")]
    NothingWatched,

    /// Acknowledging a message that was never reserved, or was already acknowledged
    #[error("Message {message_id} is not reserved")]
    NotReserved { message_id: i64 },

    #[error("Undecodable message body: {message}")]
    UndecodableBody { message: String },
}

impl MessagingError {
    pub fn queue_operation(
        channel: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            channel: channel.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn invalid_channel_name(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannelName {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    pub fn undecodable_body(message: impl Into<String>) -> Self {
        Self::UndecodableBody {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::undecodable_body(err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_operation_display() {
        let err = MessagingError::queue_operation("taskhive_new", "publish", "connection reset");
        let shown = err.to_string();
        assert!(shown.contains("publish"));
        assert!(shown.contains("taskhive_new"));
        assert!(shown.contains("connection reset"));
    }

    #[test]
    fn test_json_error_becomes_undecodable_body() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: MessagingError = json_err.into();
        assert!(matches!(err, MessagingError::UndecodableBody { .. }));
    }
}
