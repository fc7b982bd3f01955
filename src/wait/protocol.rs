//! # Result Wait Protocol
//!
//! Shared by [`crate::client::TaskHandle::value`] and
//! [`crate::client::JobHandle::join`].
//!
//! 1. Poll the store. A resolved target returns at once.
//! 2. If the target asked for notifications and a queue session is available,
//!    subscribe to the target's channel and block on it one poll interval at a
//!    time, re-polling the store between slices. Another waiter may consume the
//!    single notification, so the store stays authoritative. A target resolved
//!    by polling drains one pending notification (non-blocking) so it cannot
//!    leak to a later listener.
//! 3. Without notifications, sleep and re-poll on a [`PollSchedule`] until
//!    resolved or the deadline passes.
//!
//! The subscription is a guard, so it is released on every exit path,
//! including a caller dropping the wait future.

use crate::error::Result;
use crate::messaging::QueueSession;
use crate::wait::poller::PollSchedule;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one look at a waitable target
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Pending,
    Resolved(T),
    /// Terminal without a value; waiting longer would not help
    Failed(String),
}

impl<T> Resolution<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn into_value(self) -> Option<T> {
        match self {
            Self::Resolved(value) => Some(value),
            Self::Pending | Self::Failed(_) => None,
        }
    }
}

/// Something whose outcome can be waited on
#[async_trait]
pub trait Waitable: Send {
    type Output: Send;

    /// Re-read the target from the store
    async fn poll(&mut self) -> Result<Resolution<Self::Output>>;

    /// Interpret a message received on the notification channel
    async fn on_notification(&mut self, body: &Value) -> Result<Resolution<Self::Output>>;

    fn notify_enabled(&self) -> bool;

    fn notification_channel(&self) -> String;
}

/// Wait for `target` to resolve before `schedule` expires
pub async fn wait_for<W: Waitable + ?Sized>(
    target: &mut W,
    session: Option<&mut QueueSession>,
    schedule: PollSchedule,
) -> Result<Option<W::Output>> {
    let first = target.poll().await?;

    match session {
        Some(session) if target.notify_enabled() => {
            wait_on_channel(target, session, first, schedule).await
        }
        _ => {
            if !first.is_pending() {
                return Ok(first.into_value());
            }
            poll_until(target, schedule).await
        }
    }
}

async fn wait_on_channel<W: Waitable + ?Sized>(
    target: &mut W,
    session: &mut QueueSession,
    first: Resolution<W::Output>,
    mut schedule: PollSchedule,
) -> Result<Option<W::Output>> {
    let channel = target.notification_channel();
    let subscription = session.subscribe(channel.clone());

    let resolution = if first.is_pending() {
        debug!(channel = %channel, remaining_ms = ?schedule.remaining().map(|r| r.as_millis()), "🔔 Waiting for notification");
        loop {
            let Some(slice) = schedule.next_slice() else {
                // one last look before giving up
                let last = target.poll().await?;
                if last.is_pending() {
                    debug!(channel = %channel, slices = schedule.ticks(), "⏰ Wait timed out");
                    return Ok(None);
                }
                break last;
            };

            if let Some(message) = subscription.reserve(Some(slice)).await? {
                subscription.acknowledge(&message).await?;
                let resolution = target.on_notification(&message.body).await?;
                if !resolution.is_pending() {
                    return Ok(resolution.into_value());
                }
                warn!(channel = %channel, "⚠️ Notification did not resolve target");
                continue;
            }

            let polled = target.poll().await?;
            if !polled.is_pending() {
                debug!(channel = %channel, slices = schedule.ticks(), "✅ Resolved by polling while subscribed");
                break polled;
            }
        }
    } else {
        first
    };

    if let Some(stale) = subscription.reserve(Some(Duration::ZERO)).await? {
        subscription.acknowledge(&stale).await?;
        debug!(channel = %channel, message_id = %stale.id, "🧹 Drained notification for resolved target");
    }
    Ok(resolution.into_value())
}

async fn poll_until<W: Waitable + ?Sized>(
    target: &mut W,
    mut schedule: PollSchedule,
) -> Result<Option<W::Output>> {
    while schedule.tick().await {
        let resolution = target.poll().await?;
        if !resolution.is_pending() {
            debug!(ticks = schedule.ticks(), "✅ Resolved by polling");
            return Ok(resolution.into_value());
        }
    }
    debug!(ticks = schedule.ticks(), "⏰ Wait timed out");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{InMemoryQueue, MessageQueue};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Resolves after a fixed number of polls
    struct Countdown {
        polls_left: u32,
        polls: u32,
        notify: bool,
    }

    impl Countdown {
        fn new(polls_left: u32, notify: bool) -> Self {
            Self {
                polls_left,
                polls: 0,
                notify,
            }
        }
    }

    #[async_trait]
    impl Waitable for Countdown {
        type Output = u32;

        async fn poll(&mut self) -> Result<Resolution<u32>> {
            self.polls += 1;
            if self.polls_left == 0 {
                return Ok(Resolution::Resolved(42));
            }
            self.polls_left -= 1;
            Ok(Resolution::Pending)
        }

        async fn on_notification(&mut self, body: &Value) -> Result<Resolution<u32>> {
            Ok(body
                .as_u64()
                .map(|v| Resolution::Resolved(v as u32))
                .unwrap_or(Resolution::Pending))
        }

        fn notify_enabled(&self) -> bool {
            self.notify
        }

        fn notification_channel(&self) -> String {
            "Countdown-1".to_string()
        }
    }

    fn schedule(timeout: Option<Duration>) -> PollSchedule {
        PollSchedule::new(Duration::from_secs(1), timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolved_target_returns_without_sleeping() {
        let started = Instant::now();
        let mut target = Countdown::new(0, false);
        let value = wait_for(&mut target, None, schedule(None)).await.unwrap();
        assert_eq!(value, Some(42));
        assert_eq!(target.polls, 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_resolved() {
        let mut target = Countdown::new(3, false);
        let value = wait_for(&mut target, None, schedule(Some(Duration::from_secs(10))))
            .await
            .unwrap();
        assert_eq!(value, Some(42));
        assert_eq!(target.polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout() {
        let started = Instant::now();
        let mut target = Countdown::new(100, false);
        let value = wait_for(&mut target, None, schedule(Some(Duration::from_secs(3))))
            .await
            .unwrap();
        assert_eq!(value, None);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_path_receives_notification() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut session = QueueSession::new(queue.clone());
        queue.publish("Countdown-1", &json!(7)).await.unwrap();

        let mut target = Countdown::new(100, true);
        let timeout = Some(Duration::from_secs(5));
        let value = wait_for(&mut target, Some(&mut session), schedule(timeout))
            .await
            .unwrap();
        assert_eq!(value, Some(7));
        assert!(session.watching().is_empty());
        assert_eq!(queue.reserved_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_path_drains_stale_message_when_resolved() {
        let queue = Arc::new(InMemoryQueue::new());
        let mut session = QueueSession::new(queue.clone());
        queue.publish("Countdown-1", &json!(7)).await.unwrap();
        queue.publish("Countdown-1", &json!(8)).await.unwrap();

        let mut target = Countdown::new(0, true);
        let value = wait_for(&mut target, Some(&mut session), schedule(None))
            .await
            .unwrap();
        assert_eq!(value, Some(42));
        // exactly one drained
        assert_eq!(queue.ready_count("Countdown-1"), 1);
        assert!(session.watching().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_path_repolls_between_slices() {
        let started = Instant::now();
        let queue = Arc::new(InMemoryQueue::new());
        let mut session = QueueSession::new(queue.clone());

        // never notified: resolved by the third poll, one slice per poll
        let mut target = Countdown::new(2, true);
        let value = wait_for(&mut target, Some(&mut session), schedule(Some(Duration::from_secs(10))))
            .await
            .unwrap();
        assert_eq!(value, Some(42));
        assert_eq!(target.polls, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert!(session.watching().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_path_zero_timeout_returns_immediately() {
        let started = Instant::now();
        let queue = Arc::new(InMemoryQueue::new());
        let mut session = QueueSession::new(queue);
        let mut target = Countdown::new(100, true);
        let value = wait_for(&mut target, Some(&mut session), schedule(Some(Duration::ZERO)))
            .await
            .unwrap();
        assert_eq!(value, None);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(session.watching().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resolution_stops_waiting() {
        struct Broken;

        #[async_trait]
        impl Waitable for Broken {
            type Output = ();

            async fn poll(&mut self) -> Result<Resolution<()>> {
                Ok(Resolution::Failed("boom".into()))
            }

            async fn on_notification(&mut self, _body: &Value) -> Result<Resolution<()>> {
                Ok(Resolution::Pending)
            }

            fn notify_enabled(&self) -> bool {
                false
            }

            fn notification_channel(&self) -> String {
                "Broken-1".into()
            }
        }

        let started = Instant::now();
        let value = wait_for(&mut Broken, None, schedule(None)).await.unwrap();
        assert_eq!(value, None);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
