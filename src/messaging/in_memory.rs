//! # In-Memory Queue
//!
//! Process-local [`MessageQueue`] with real reservation semantics: a reserved
//! message is invisible to other consumers until acknowledged. Blocking
//! reserves park on a `tokio::sync::Notify`, so they honour tokio's paused
//! clock in tests.
//!
//! `fail_next_publishes` makes the next N publishes fail without delivering
//! anything, for exercising the enqueue-retry policy.

use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::message::{MessageId, ReservedMessage};
use crate::messaging::traits::MessageQueue;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    body: Value,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: HashMap<String, VecDeque<StoredMessage>>,
    reserved: HashMap<MessageId, String>,
}

#[derive(Debug)]
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    next_id: AtomicI64,
    failing_publishes: AtomicUsize,
    published: AtomicUsize,
    arrivals: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            next_id: AtomicI64::new(1),
            failing_publishes: AtomicUsize::new(0),
            published: AtomicUsize::new(0),
            arrivals: Notify::new(),
        }
    }

    /// Reject the next `count` publishes without delivering them
    pub fn fail_next_publishes(&self, count: usize) {
        self.failing_publishes.store(count, Ordering::SeqCst);
    }

    /// Number of ready (unreserved) messages on `channel`
    pub fn ready_count(&self, channel: &str) -> usize {
        self.state
            .lock()
            .ready
            .get(channel)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Number of messages reserved but not yet acknowledged
    pub fn reserved_count(&self) -> usize {
        self.state.lock().reserved.len()
    }

    /// Total messages accepted since creation
    pub fn published_count(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }

    /// Bodies of the ready messages on `channel`, oldest first
    pub fn ready_bodies(&self, channel: &str) -> Vec<Value> {
        self.state
            .lock()
            .ready
            .get(channel)
            .map(|q| q.iter().map(|m| m.body.clone()).collect())
            .unwrap_or_default()
    }

    fn try_reserve(&self, channels: &[String]) -> Option<ReservedMessage> {
        let mut state = self.state.lock();
        for channel in channels {
            let next = state.ready.get_mut(channel).and_then(VecDeque::pop_front);
            if let Some(stored) = next {
                state.reserved.insert(stored.id, channel.clone());
                return Some(ReservedMessage::new(stored.id, channel.clone(), stored.body));
            }
        }
        None
    }

    fn take_failure(&self) -> bool {
        self.failing_publishes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn publish(&self, channel: &str, body: &Value) -> MessagingResult<MessageId> {
        if channel.is_empty() {
            return Err(MessagingError::invalid_channel_name(channel, "empty"));
        }
        if self.take_failure() {
            warn!(channel = %channel, "💥 Injected publish failure");
            return Err(MessagingError::queue_operation(
                channel,
                "publish",
                "injected failure",
            ));
        }

        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.state
            .lock()
            .ready
            .entry(channel.to_string())
            .or_default()
            .push_back(StoredMessage {
                id,
                body: body.clone(),
            });
        self.published.fetch_add(1, Ordering::SeqCst);
        self.arrivals.notify_waiters();

        debug!(channel = %channel, message_id = %id, "📤 Message published");
        Ok(id)
    }

    async fn reserve(
        &self,
        channels: &[String],
        timeout: Option<Duration>,
    ) -> MessagingResult<Option<ReservedMessage>> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            // register interest before checking, so a publish in between is not missed
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            if let Some(message) = self.try_reserve(channels) {
                debug!(
                    channel = %message.channel,
                    message_id = %message.id,
                    "📥 Message reserved"
                );
                return Ok(Some(message));
            }

            match deadline {
                None => arrival.await,
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn peek_ready(&self, channels: &[String]) -> MessagingResult<bool> {
        let state = self.state.lock();
        Ok(channels
            .iter()
            .any(|c| state.ready.get(c).is_some_and(|q| !q.is_empty())))
    }

    async fn acknowledge(&self, message: &ReservedMessage) -> MessagingResult<()> {
        match self.state.lock().reserved.remove(&message.id) {
            Some(_) => {
                debug!(message_id = %message.id, "🗑️ Message acknowledged");
                Ok(())
            }
            None => Err(MessagingError::NotReserved {
                message_id: message.id.0,
            }),
        }
    }

    async fn release(&self, message: &ReservedMessage) -> MessagingResult<()> {
        {
            let mut state = self.state.lock();
            let Some(channel) = state.reserved.remove(&message.id) else {
                return Err(MessagingError::NotReserved {
                    message_id: message.id.0,
                });
            };
            state.ready.entry(channel).or_default().push_front(StoredMessage {
                id: message.id,
                body: message.body.clone(),
            });
        }
        self.arrivals.notify_waiters();
        debug!(channel = %message.channel, message_id = %message.id, "↩️ Message released");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}
