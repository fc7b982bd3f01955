//! # Client
//!
//! Creates task messages and jobs and hands them to the queue. Enqueue
//! failures never surface as `Err`: they are recorded as `notqueued` on the
//! entity and the handle is returned anyway.

use crate::client::job_handle::JobHandle;
use crate::client::task_handle::TaskHandle;
use crate::constants::fields;
use crate::context::HiveContext;
use crate::error::Result;
use crate::logging::log_task_operation;
use crate::messaging::enqueue_with_retry;
use crate::models::{entity, Job, TaskMessage};
use crate::state_machine::{TaskEvent, TaskStatus};
use serde_json::Value;
use tracing::{debug, info};

/// Optional per-task settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Publish completion to the entity's own notification channel
    pub notify: bool,
    /// Function invoked as a new task with `[id, result_locator]` once this one completes
    pub callback: Option<String>,
}

impl TaskOptions {
    pub fn notify() -> Self {
        Self {
            notify: true,
            callback: None,
        }
    }

    pub fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    pub fn with_callback(mut self, callback: impl Into<String>) -> Self {
        self.callback = Some(callback.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    ctx: HiveContext,
}

impl Client {
    pub fn new(ctx: HiveContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &HiveContext {
        &self.ctx
    }

    /// Create, persist and enqueue a standalone task
    pub async fn submit_task(
        &self,
        function: impl Into<String>,
        args: Vec<Value>,
        options: TaskOptions,
    ) -> Result<TaskHandle> {
        let mut task = TaskMessage::create(
            self.ctx.store.as_ref(),
            function,
            args,
            options.notify,
            options.callback,
        )
        .await?;
        log_task_operation(
            "create",
            &task.id,
            Some(task.function.as_str()),
            task.status.as_str(),
            None,
        );

        enqueue_task(&self.ctx, &mut task).await?;
        Ok(TaskHandle::new(self.ctx.clone(), task))
    }

    /// Create a job in status `new`; nothing is enqueued until [`JobHandle::enqueue_tasks`]
    pub async fn new_job(&self, options: TaskOptions) -> Result<JobHandle> {
        let job = Job::create(self.ctx.store.as_ref(), options.notify, options.callback).await?;
        info!(job_id = %job.id, notify = job.notify, "🧺 Job created");
        Ok(JobHandle::new(self.ctx.clone(), job))
    }

    /// Reattach to an existing task by id
    pub async fn task(&self, id: &str) -> Result<TaskHandle> {
        let task = TaskMessage::find_by_id(self.ctx.store.as_ref(), id).await?;
        debug!(task_id = %id, status = %task.status, "🔗 Reattached to task");
        Ok(TaskHandle::new(self.ctx.clone(), task))
    }

    /// Reattach to an existing job by id
    pub async fn job(&self, id: &str) -> Result<JobHandle> {
        let job = Job::find_by_id(self.ctx.store.as_ref(), id).await?;
        debug!(job_id = %id, status = %job.status, "🔗 Reattached to job");
        Ok(JobHandle::reattach(self.ctx.clone(), job))
    }
}

/// Move `task` to `queued` and publish it to the intake channel, one retry
///
/// `queued` is persisted before publishing so a fast worker's `running` is never
/// overwritten. If both attempts fail the task is persisted as `notqueued`.
pub(crate) async fn enqueue_task(ctx: &HiveContext, task: &mut TaskMessage) -> Result<TaskStatus> {
    let store = ctx.store.as_ref();
    task.apply(&TaskEvent::Enqueue)?;
    entity::save_fields(store, task, &[fields::STATUS]).await?;

    let body = task.to_message_body()?;
    let channel = &ctx.config.queue.new_task_channel;
    match enqueue_with_retry(ctx.queue.as_ref(), channel, &body).await {
        Some(message_id) => {
            let details = format!("message_id={message_id}");
            log_task_operation(
                "enqueue",
                &task.id,
                Some(task.function.as_str()),
                task.status.as_str(),
                Some(details.as_str()),
            );
        }
        None => {
            task.apply(&TaskEvent::EnqueueFailed)?;
            entity::save_fields(store, task, &[fields::STATUS]).await?;
            log_task_operation(
                "enqueue",
                &task.id,
                Some(task.function.as_str()),
                task.status.as_str(),
                None,
            );
        }
    }
    Ok(task.status)
}
