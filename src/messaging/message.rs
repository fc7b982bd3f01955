//! # Queue Message Types
//!
//! Identifiers and reserved-message envelopes handed out by queue adapters.
//! Bodies are JSON; the task/job payload schema lives in `crate::models`.

use crate::messaging::errors::{MessagingError, MessagingResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the queue on a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Only positive identifiers denote an accepted message
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message exclusively claimed by one consumer until acknowledged
#[derive(Debug, Clone)]
pub struct ReservedMessage {
    pub id: MessageId,
    pub channel: String,
    pub body: serde_json::Value,
    pub reserved_at: DateTime<Utc>,
}

impl ReservedMessage {
    pub fn new(id: MessageId, channel: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id,
            channel: channel.into(),
            body,
            reserved_at: Utc::now(),
        }
    }

    /// The `type` discriminator of the body, if present
    pub fn message_type(&self) -> Option<&str> {
        self.body.get("type").and_then(|t| t.as_str())
    }

    /// Deserialize the body into a typed payload
    pub fn decode<T: DeserializeOwned>(&self) -> MessagingResult<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            MessagingError::undecodable_body(format!(
                "message {} on {}: {e}",
                self.id, self.channel
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_id_validity() {
        assert!(MessageId(1).is_valid());
        assert!(!MessageId(0).is_valid());
        assert!(!MessageId(-3).is_valid());
    }

    #[test]
    fn test_message_type_and_decode() {
        let msg = ReservedMessage::new(
            MessageId(7),
            "taskhive_new",
            json!({"type": "task", "value": 42}),
        );
        assert_eq!(msg.message_type(), Some("task"));

        #[derive(Deserialize)]
        struct Payload {
            value: i64,
        }
        let payload: Payload = msg.decode().unwrap();
        assert_eq!(payload.value, 42);

        let bad: MessagingResult<Vec<String>> = msg.decode();
        assert!(matches!(
            bad,
            Err(MessagingError::UndecodableBody { .. })
        ));
    }
}
