use crate::constants::fields;
use crate::context::HiveContext;
use crate::error::Result;
use crate::models::{entity, Entity, ResultLocator, TaskMessage};
use crate::state_machine::TaskStatus;
use crate::wait::{wait_for, PollSchedule, Resolution, Waitable};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const RESULT_FIELDS: &[&str] = &[fields::STATUS, fields::RESULT_LOCATOR, fields::ERROR];

/// Caller-side reference to a submitted task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    ctx: HiveContext,
    task: TaskMessage,
    cached: Option<Value>,
}

impl TaskHandle {
    pub(crate) fn new(ctx: HiveContext, task: TaskMessage) -> Self {
        Self {
            ctx,
            task,
            cached: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    /// Local copy of the task as last read
    pub fn message(&self) -> &TaskMessage {
        &self.task
    }

    /// Status as last read; see [`TaskHandle::refresh_status`]
    pub fn status(&self) -> TaskStatus {
        self.task.status
    }

    pub fn error(&self) -> Option<&str> {
        self.task.error.as_deref()
    }

    pub fn result_locator(&self) -> Option<&ResultLocator> {
        self.task.result_locator.as_ref()
    }

    pub fn channel_name(&self) -> String {
        self.task.channel_name()
    }

    /// Re-read status, result locator and error from the store
    pub async fn refresh_status(&mut self) -> Result<TaskStatus> {
        entity::reload(self.ctx.store.as_ref(), &mut self.task, RESULT_FIELDS).await?;
        Ok(self.task.status)
    }

    /// The task's result, waiting up to `timeout` (`None` waits indefinitely)
    ///
    /// Returns `None` on timeout, and for a task that failed (`status()` is then
    /// `unknown` and `error()` says why). A resolved value is cached.
    pub async fn value(&mut self, timeout: Option<Duration>) -> Result<Option<Value>> {
        if let Some(value) = &self.cached {
            return Ok(Some(value.clone()));
        }

        let schedule = PollSchedule::from_config(&self.ctx.config.wait, timeout);
        let mut session = self.ctx.session();
        let value = wait_for(&mut *self, Some(&mut session), schedule).await?;
        if let Some(value) = &value {
            self.cached = Some(value.clone());
        }
        Ok(value)
    }

    async fn resolve_local(&self) -> Result<Resolution<Value>> {
        if let Some(locator) = &self.task.result_locator {
            return match self.ctx.results.fetch(locator).await? {
                Some(value) => Ok(Resolution::Resolved(value)),
                None => {
                    warn!(task_id = %self.task.id, locator = %locator, "⚠️ Result locator points at nothing");
                    Ok(Resolution::Pending)
                }
            };
        }
        if self.task.status == TaskStatus::Unknown {
            let reason = self.task.error.clone().unwrap_or_else(|| "unknown failure".to_string());
            return Ok(Resolution::Failed(reason));
        }
        Ok(Resolution::Pending)
    }
}

#[async_trait]
impl Waitable for TaskHandle {
    type Output = Value;

    async fn poll(&mut self) -> Result<Resolution<Value>> {
        self.refresh_status().await?;
        self.resolve_local().await
    }

    async fn on_notification(&mut self, body: &Value) -> Result<Resolution<Value>> {
        let notified = TaskMessage::from_message_body(body)?;
        if notified.id != self.task.id {
            warn!(task_id = %self.task.id, notified_id = %notified.id, "⚠️ Notification for another task");
            return self.poll().await;
        }
        self.task.status = notified.status;
        self.task.result_locator = notified.result_locator;
        self.task.error = notified.error;
        self.resolve_local().await
    }

    fn notify_enabled(&self) -> bool {
        self.task.notify
    }

    fn notification_channel(&self) -> String {
        self.channel_name()
    }
}
