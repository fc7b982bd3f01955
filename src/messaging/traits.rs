//! # Queue Adapter Contract
//!
//! The operations the coordinator needs from a message queue. Subscription
//! state (which channels a consumer watches, which channel it produces to)
//! lives in [`crate::messaging::QueueSession`], so backends stay stateless per call.

use crate::messaging::errors::MessagingResult;
use crate::messaging::message::{MessageId, ReservedMessage};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait MessageQueue: Send + Sync + std::fmt::Debug {
    /// Append `body` to `channel`, returning the queue-assigned message id
    async fn publish(&self, channel: &str, body: &Value) -> MessagingResult<MessageId>;

    /// Claim the next ready message from any of `channels`
    ///
    /// `None` timeout blocks until a message arrives; a zero timeout never blocks.
    async fn reserve(
        &self,
        channels: &[String],
        timeout: Option<Duration>,
    ) -> MessagingResult<Option<ReservedMessage>>;

    /// Whether any of `channels` has a ready (unreserved) message
    async fn peek_ready(&self, channels: &[String]) -> MessagingResult<bool>;

    /// Delete a reserved message, making the reservation permanent
    async fn acknowledge(&self, message: &ReservedMessage) -> MessagingResult<()>;

    /// Return a reserved message to the head of its channel for another consumer
    async fn release(&self, message: &ReservedMessage) -> MessagingResult<()>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
