//! # Queue Sessions
//!
//! A `QueueSession` is one consumer's view of the queue: the channel it
//! produces to and the set of channels it watches. Subscribing to a channel
//! yields a [`Subscription`] guard that stops watching the channel when dropped,
//! so timeouts, early returns and `?` all release the subscription.

use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::message::{MessageId, ReservedMessage};
use crate::messaging::traits::MessageQueue;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CHANNEL: &str = "default";

#[derive(Debug, Clone)]
pub struct QueueSession {
    queue: Arc<dyn MessageQueue>,
    producing: String,
    watched: Vec<String>,
}

impl QueueSession {
    /// New session producing to the `default` channel and watching nothing
    pub fn new(queue: Arc<dyn MessageQueue>) -> Self {
        Self {
            queue,
            producing: DEFAULT_CHANNEL.to_string(),
            watched: Vec::new(),
        }
    }

    /// Select the channel subsequent [`QueueSession::put`] calls publish to
    pub fn use_channel(&mut self, channel: impl Into<String>) {
        self.producing = channel.into();
    }

    pub fn using(&self) -> &str {
        &self.producing
    }

    pub fn watching(&self) -> &[String] {
        &self.watched
    }

    /// Start consuming from `channel`; watching twice is a no-op
    pub fn watch(&mut self, channel: impl Into<String>) {
        let channel = channel.into();
        if !self.watched.contains(&channel) {
            debug!(channel = %channel, "👀 Watching channel");
            self.watched.push(channel);
        }
    }

    /// Stop consuming from `channel`
    pub fn ignore(&mut self, channel: &str) {
        if let Some(pos) = self.watched.iter().position(|c| c == channel) {
            debug!(channel = %channel, "🙈 Ignoring channel");
            self.watched.remove(pos);
        }
    }

    /// Watch `channel` for the lifetime of the returned guard
    pub fn subscribe(&mut self, channel: impl Into<String>) -> Subscription<'_> {
        let channel = channel.into();
        let already_watched = self.watched.contains(&channel);
        self.watch(channel.clone());
        Subscription {
            session: self,
            channel,
            already_watched,
        }
    }

    /// Publish `body` to the producing channel
    pub async fn put(&self, body: &Value) -> MessagingResult<MessageId> {
        self.queue.publish(&self.producing, body).await
    }

    /// Reserve the next message from any watched channel
    pub async fn reserve(
        &self,
        timeout: Option<Duration>,
    ) -> MessagingResult<Option<ReservedMessage>> {
        if self.watched.is_empty() {
            return Err(MessagingError::NothingWatched);
        }
        self.queue.reserve(&self.watched, timeout).await
    }

    pub async fn peek_ready(&self) -> MessagingResult<bool> {
        if self.watched.is_empty() {
            return Ok(false);
        }
        self.queue.peek_ready(&self.watched).await
    }

    pub async fn acknowledge(&self, message: &ReservedMessage) -> MessagingResult<()> {
        self.queue.acknowledge(message).await
    }

    /// Give up a reservation so the message can be processed again
    pub async fn release(&self, message: &ReservedMessage) -> MessagingResult<()> {
        self.queue.release(message).await
    }

    pub fn queue(&self) -> &Arc<dyn MessageQueue> {
        &self.queue
    }
}

/// Scoped channel subscription; unsubscribes on drop
#[derive(Debug)]
pub struct Subscription<'a> {
    session: &'a mut QueueSession,
    channel: String,
    already_watched: bool,
}

impl Subscription<'_> {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn reserve(
        &self,
        timeout: Option<Duration>,
    ) -> MessagingResult<Option<ReservedMessage>> {
        self.session.reserve(timeout).await
    }

    pub async fn peek_ready(&self) -> MessagingResult<bool> {
        self.session.peek_ready().await
    }

    pub async fn acknowledge(&self, message: &ReservedMessage) -> MessagingResult<()> {
        self.session.acknowledge(message).await
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        // a channel the session watched before subscribing stays watched
        if !self.already_watched {
            self.session.ignore(&self.channel);
        }
    }
}
