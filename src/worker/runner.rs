//! # Worker Loop
//!
//! One worker processes one message at a time: reserve from the intake channel,
//! mark `running`, invoke, persist the result, account for the parent job,
//! enqueue the callback, notify, and finally acknowledge. Any number of workers
//! may run against the same queue; the queue's reservation makes each message
//! theirs alone until acknowledged.
//!
//! A task that cannot run (bad reference, unregistered function, error, panic
//! or timeout) is marked `unknown` with an `error`, copied to the dead-letter
//! channel and acknowledged, so it is never redelivered. An infrastructure
//! error while handling a message (the store or queue failing under us) is
//! different: the reservation is released so another attempt can pick the
//! message up.

use crate::client::hive_client::enqueue_task;
use crate::constants::{fields, message_types};
use crate::context::HiveContext;
use crate::error::{Result, TaskhiveError};
use crate::logging::log_task_operation;
use crate::messaging::{enqueue_with_retry, QueueSession, ReservedMessage};
use crate::models::{entity, Entity, TaskMessage};
use crate::state_machine::{TaskEvent, TaskStatus};
use crate::worker::completion;
use crate::worker::registry::FunctionRegistry;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What [`Worker::process_next`] did
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Completed { task_id: String },
    /// `task_id` is `None` when the message could not be read as a task
    Failed {
        task_id: Option<String>,
        reason: String,
    },
    /// Nothing arrived before the reserve timeout
    Idle,
}

#[derive(Debug)]
pub struct Worker {
    worker_id: String,
    ctx: HiveContext,
    registry: Arc<FunctionRegistry>,
    session: QueueSession,
}

impl Worker {
    pub fn new(ctx: HiveContext, registry: Arc<FunctionRegistry>) -> Self {
        let mut session = ctx.session();
        session.watch(ctx.config.queue.new_task_channel.clone());
        let worker_id = format!("worker-{}", &Uuid::new_v4().to_string()[..8]);
        info!(
            worker_id = %worker_id,
            channel = %ctx.config.queue.new_task_channel,
            functions = registry.function_count(),
            "🚀 Worker created"
        );
        Self {
            worker_id,
            ctx,
            registry,
            session,
        }
    }

    pub fn id(&self) -> &str {
        &self.worker_id
    }

    /// Process messages until `shutdown` turns true or its sender is dropped
    ///
    /// Returns the number of messages processed. A message already reserved is
    /// always finished before shutdown is honoured.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<u64> {
        info!(worker_id = %self.worker_id, "▶️ Worker loop started");
        let reserve_timeout = self.ctx.config.worker.reserve_timeout();
        let mut processed = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let reserved = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                reserved = self.session.reserve(reserve_timeout) => reserved,
            };

            let message = match reserved {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_id = %self.worker_id, error = %e, "❌ Reserve failed");
                    tokio::time::sleep(self.ctx.config.wait.poll_interval()).await;
                    continue;
                }
            };

            match self.process(message).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(worker_id = %self.worker_id, error = %e, "❌ Message processing failed");
                    // the message went back to the queue; don't spin on it
                    tokio::time::sleep(self.ctx.config.wait.poll_interval()).await;
                }
            }
        }

        info!(worker_id = %self.worker_id, processed, "🛑 Worker loop stopped");
        Ok(processed)
    }

    /// Reserve and process at most one message, waiting up to `timeout`
    pub async fn process_next(&mut self, timeout: Option<Duration>) -> Result<WorkerOutcome> {
        match self.session.reserve(timeout).await? {
            Some(message) => self.process(message).await,
            None => Ok(WorkerOutcome::Idle),
        }
    }

    /// Execute one reserved message and acknowledge it
    ///
    /// On error the reservation is released rather than left dangling.
    pub async fn process(&mut self, message: ReservedMessage) -> Result<WorkerOutcome> {
        debug!(worker_id = %self.worker_id, message_id = %message.id, "📥 Processing message");

        let result = self.execute(&message).await;
        if let Err(e) = &result {
            match self.session.release(&message).await {
                Ok(()) => {
                    warn!(worker_id = %self.worker_id, message_id = %message.id, error = %e, "↩️ Released message after error")
                }
                Err(release_err) => {
                    error!(message_id = %message.id, error = %release_err, "❌ Could not release message")
                }
            }
        }
        result
    }

    async fn execute(&self, message: &ReservedMessage) -> Result<WorkerOutcome> {
        let mut task = match message.message_type() {
            Some(message_types::SIMPLE_TASK | message_types::JOB_TASK) => {
                match message.decode::<TaskMessage>() {
                    Ok(task) => task,
                    Err(e) => return self.reject(message, format!("undecodable task: {e}")).await,
                }
            }
            other => {
                let reason = format!("not a task message (type {other:?})");
                return self.reject(message, reason).await;
            }
        };

        self.start(&mut task).await?;

        let invocation = match task.function_ref() {
            Ok(reference) => {
                let timeout = self.ctx.config.worker.invocation_timeout();
                self.registry.invoke(&reference, task.args.clone(), timeout).await
            }
            Err(e) => Err(e),
        };
        let value = match invocation {
            Ok(value) => value,
            Err(e) => return self.fail(message, task, e).await,
        };

        self.complete(&mut task, &value).await?;
        self.after_complete(&task).await?;

        self.session.acknowledge(message).await?;
        log_task_operation(
            "acknowledge",
            &task.id,
            Some(task.function.as_str()),
            task.status.as_str(),
            None,
        );
        Ok(WorkerOutcome::Completed { task_id: task.id })
    }

    async fn start(&self, task: &mut TaskMessage) -> Result<()> {
        if let Err(e) = task.apply(&TaskEvent::Start) {
            // the persisted status wins over what the message body carried
            warn!(task_id = %task.id, error = %e, "⚠️ Unexpected status on reserve; running anyway");
            task.status = TaskStatus::Running;
        }
        entity::save_fields(self.ctx.store.as_ref(), task, &[fields::STATUS]).await?;
        log_task_operation(
            "start",
            &task.id,
            Some(task.function.as_str()),
            task.status.as_str(),
            Some(self.worker_id.as_str()),
        );
        Ok(())
    }

    async fn complete(&self, task: &mut TaskMessage, value: &Value) -> Result<()> {
        let locator = self.ctx.results.store_result(value).await?;
        task.result_locator = Some(locator);
        task.apply(&TaskEvent::Complete)?;
        entity::save_fields(
            self.ctx.store.as_ref(),
            task,
            &[fields::RESULT_LOCATOR, fields::STATUS],
        )
        .await?;
        log_task_operation(
            "complete",
            &task.id,
            Some(task.function.as_str()),
            task.status.as_str(),
            None,
        );
        Ok(())
    }

    async fn after_complete(&self, task: &TaskMessage) -> Result<()> {
        if let Some(job_id) = task.job_id() {
            completion::on_subtask_complete(&self.ctx, job_id).await?;
        }

        if let Some(callback) = &task.callback {
            let locator = task.result_locator.as_ref().map(ToString::to_string);
            let args = vec![json!(task.id), json!(locator)];
            let mut callback_task =
                TaskMessage::create(self.ctx.store.as_ref(), callback.clone(), args, false, None)
                    .await?;
            let status = enqueue_task(&self.ctx, &mut callback_task).await?;
            info!(task_id = %task.id, callback_task_id = %callback_task.id, status = %status, "📞 Callback enqueued");
        }

        if task.notify {
            self.notify(task).await?;
        }
        Ok(())
    }

    async fn notify(&self, task: &TaskMessage) -> Result<()> {
        let channel = task.channel_name();
        let body = task.to_message_body()?;
        if enqueue_with_retry(self.ctx.queue.as_ref(), &channel, &body).await.is_none() {
            warn!(task_id = %task.id, channel = %channel, "⚠️ Notification was not delivered");
        }
        Ok(())
    }

    /// Record a failed task, dead-letter its message and acknowledge it
    async fn fail(
        &self,
        message: &ReservedMessage,
        mut task: TaskMessage,
        error: TaskhiveError,
    ) -> Result<WorkerOutcome> {
        let reason = format!("{}: {error}", error.kind());
        if let Err(e) = task.apply(&TaskEvent::Fail(reason.clone())) {
            warn!(task_id = %task.id, error = %e, "⚠️ Unexpected status on failure; recording anyway");
            task.status = TaskStatus::Unknown;
            task.error = Some(reason.clone());
        }
        entity::save_fields(self.ctx.store.as_ref(), &task, &[fields::STATUS, fields::ERROR]).await?;
        log_task_operation(
            "fail",
            &task.id,
            Some(task.function.as_str()),
            task.status.as_str(),
            Some(reason.as_str()),
        );

        self.dead_letter(message, &reason).await;
        if task.notify {
            self.notify(&task).await?;
        }
        self.session.acknowledge(message).await?;
        Ok(WorkerOutcome::Failed {
            task_id: Some(task.id),
            reason,
        })
    }

    /// Dead-letter and acknowledge a message that is not a runnable task
    async fn reject(&self, message: &ReservedMessage, reason: String) -> Result<WorkerOutcome> {
        warn!(worker_id = %self.worker_id, message_id = %message.id, reason = %reason, "🚫 Rejecting message");
        self.dead_letter(message, &reason).await;
        self.session.acknowledge(message).await?;
        Ok(WorkerOutcome::Failed {
            task_id: None,
            reason,
        })
    }

    async fn dead_letter(&self, message: &ReservedMessage, reason: &str) {
        let body = json!({
            "reason": reason,
            "worker_id": self.worker_id,
            "channel": message.channel,
            "failed_at": Utc::now().to_rfc3339(),
            "body": message.body,
        });
        let channel = &self.ctx.config.queue.dead_letter_channel;
        if enqueue_with_retry(self.ctx.queue.as_ref(), channel, &body).await.is_none() {
            error!(message_id = %message.id, "❌ Dead-letter publish failed");
        }
    }
}
