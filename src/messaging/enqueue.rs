//! # Bounded Enqueue Retry
//!
//! One attempt, then exactly one retry. The outcome is reported as `Option`
//! rather than an error: callers record it as entity status.

use crate::messaging::message::MessageId;
use crate::messaging::traits::MessageQueue;
use serde_json::Value;
use tracing::{debug, warn};

pub const MAX_ENQUEUE_ATTEMPTS: usize = 2;

/// Publish `body` to `channel`, retrying once if the queue does not return a valid id
pub async fn enqueue_with_retry(
    queue: &dyn MessageQueue,
    channel: &str,
    body: &Value,
) -> Option<MessageId> {
    for attempt in 1..=MAX_ENQUEUE_ATTEMPTS {
        match queue.publish(channel, body).await {
            Ok(id) if id.is_valid() => {
                debug!(channel = %channel, message_id = %id, attempt, "✅ Enqueued");
                return Some(id);
            }
            Ok(id) => {
                warn!(channel = %channel, message_id = %id, attempt, "⚠️ Queue returned an invalid message id");
            }
            Err(e) => {
                warn!(channel = %channel, error = %e, attempt, "⚠️ Enqueue attempt failed");
            }
        }
    }
    warn!(
        channel = %channel,
        attempts = MAX_ENQUEUE_ATTEMPTS,
        "❌ Giving up on enqueue"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryQueue;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let queue = InMemoryQueue::new();
        let id = enqueue_with_retry(&queue, "taskhive_new", &json!({"n": 1})).await;
        assert!(id.is_some());
        assert_eq!(queue.ready_count("taskhive_new"), 1);
    }

    #[tokio::test]
    async fn test_single_failure_is_retried() {
        let queue = InMemoryQueue::new();
        queue.fail_next_publishes(1);
        let id = enqueue_with_retry(&queue, "taskhive_new", &json!({"n": 1})).await;
        assert!(id.is_some());
        assert_eq!(queue.ready_count("taskhive_new"), 1);
    }

    #[tokio::test]
    async fn test_two_failures_give_up_without_delivery() {
        let queue = InMemoryQueue::new();
        queue.fail_next_publishes(2);
        let id = enqueue_with_retry(&queue, "taskhive_new", &json!({"n": 1})).await;
        assert!(id.is_none());
        assert_eq!(queue.ready_count("taskhive_new"), 0);
        assert_eq!(queue.published_count(), 0);
    }

    #[tokio::test]
    async fn test_no_third_attempt() {
        let queue = InMemoryQueue::new();
        queue.fail_next_publishes(3);
        assert!(enqueue_with_retry(&queue, "c", &json!(1)).await.is_none());
        // the third injected failure is still pending: exactly two attempts were made
        assert!(queue.publish("c", &json!(2)).await.is_err());
        assert!(queue.publish("c", &json!(3)).await.is_ok());
    }
}
