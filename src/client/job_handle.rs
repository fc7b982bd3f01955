//! # Job Handles
//!
//! Fan-out side of a job: subtasks are created and attached locally, then
//! [`JobHandle::enqueue_tasks`] freezes `task_count` and enqueues them all.
//! The fan-in side lives with the worker in [`crate::worker::completion`].

use crate::client::hive_client::{enqueue_task, TaskOptions};
use crate::client::task_handle::TaskHandle;
use crate::constants::fields;
use crate::context::HiveContext;
use crate::error::{Result, TaskhiveError};
use crate::logging::log_job_operation;
use crate::models::{entity, Entity, Job, TaskMessage};
use crate::state_machine::TaskStatus;
use crate::wait::{wait_for, PollSchedule, Resolution, Waitable};
use crate::worker::completion;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const PROGRESS_FIELDS: &[&str] = &[
    fields::STATUS,
    fields::TASK_COUNT,
    fields::COMPLETED_TASK_COUNT,
];

#[derive(Debug, Clone)]
pub struct JobHandle {
    ctx: HiveContext,
    job: Job,
    pending: Vec<TaskMessage>,
    /// Set once `task_count` has been persisted
    finalized: bool,
    completed: bool,
}

impl JobHandle {
    pub(crate) fn new(ctx: HiveContext, job: Job) -> Self {
        Self {
            ctx,
            job,
            pending: Vec::new(),
            finalized: false,
            completed: false,
        }
    }

    /// Handle for a job loaded from the store; subtasks not yet enqueued by
    /// their creator are not visible here
    pub(crate) fn reattach(ctx: HiveContext, job: Job) -> Self {
        let finalized = job.task_count > 0 || job.status == TaskStatus::Complete;
        Self {
            finalized,
            ..Self::new(ctx, job)
        }
    }

    pub fn id(&self) -> &str {
        &self.job.id
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn status(&self) -> TaskStatus {
        self.job.status
    }

    /// Subtasks added so far (local until enqueued)
    pub fn task_count(&self) -> i64 {
        self.job.task_count
    }

    pub fn channel_name(&self) -> String {
        self.job.channel_name()
    }

    /// Create a subtask of this job without enqueuing it
    pub async fn add_task(
        &mut self,
        function: impl Into<String>,
        args: Vec<Value>,
        options: TaskOptions,
    ) -> Result<TaskHandle> {
        if self.finalized {
            return Err(TaskhiveError::StateTransition(format!(
                "job {} already enqueued its tasks",
                self.job.id
            )));
        }

        let store = self.ctx.store.as_ref();
        let task = TaskMessage::new_subtask(
            self.job.id.clone(),
            function,
            args,
            options.notify,
            options.callback,
        );
        entity::save(store, &task).await?;
        self.job.attach_task(store, &task.id).await?;
        self.job.task_count += 1;

        debug!(job_id = %self.job.id, task_id = %task.id, task_count = self.job.task_count, "➕ Subtask added");
        self.pending.push(task.clone());
        Ok(TaskHandle::new(self.ctx.clone(), task))
    }

    /// Freeze `task_count`, then enqueue every pending subtask
    ///
    /// Returns each subtask's resulting status in the order they were added. A
    /// job with no subtasks completes immediately. Calling it again does
    /// nothing, and a handle that holds none of the job's attached subtasks
    /// (another handle added them) is refused rather than finalizing the job
    /// as empty.
    pub async fn enqueue_tasks(&mut self) -> Result<Vec<TaskStatus>> {
        if self.finalized {
            debug!(job_id = %self.job.id, "Job tasks already enqueued");
            return Ok(Vec::new());
        }
        if self.pending.is_empty() {
            let attached = self.task_ids().await?;
            if !attached.is_empty() {
                return Err(TaskhiveError::StateTransition(format!(
                    "job {} has {} subtasks added through another handle",
                    self.job.id,
                    attached.len()
                )));
            }
        }

        entity::save_fields(self.ctx.store.as_ref(), &self.job, &[fields::TASK_COUNT]).await?;
        self.finalized = true;
        log_job_operation(
            "finalize",
            &self.job.id,
            Some(self.job.task_count),
            None,
            self.job.status.as_str(),
        );

        if self.job.task_count == 0 && self.job.status != TaskStatus::Complete {
            completion::finish_job(&self.ctx, &mut self.job).await?;
        }

        let mut statuses = Vec::with_capacity(self.pending.len());
        for mut task in std::mem::take(&mut self.pending) {
            statuses.push(enqueue_task(&self.ctx, &mut task).await?);
        }
        Ok(statuses)
    }

    /// Ids of every subtask attached to this job
    pub async fn task_ids(&self) -> Result<Vec<String>> {
        self.job.task_ids(self.ctx.store.as_ref()).await
    }

    /// Current value of the completed-subtask counter in the store
    pub async fn completed_task_count(&mut self) -> Result<i64> {
        entity::reload(self.ctx.store.as_ref(), &mut self.job, PROGRESS_FIELDS).await?;
        Ok(self.job.completed_task_count)
    }

    /// Wait until the job completes or `timeout` elapses
    ///
    /// The returned state is re-read from the store after waiting.
    pub async fn join(&mut self, timeout: Option<Duration>) -> Result<bool> {
        if self.completed {
            return Ok(true);
        }

        let schedule = PollSchedule::from_config(&self.ctx.config.wait, timeout);
        let mut session = self.ctx.session();
        wait_for(&mut *self, Some(&mut session), schedule).await?;

        entity::reload(self.ctx.store.as_ref(), &mut self.job, PROGRESS_FIELDS).await?;
        self.completed = self.job.status == TaskStatus::Complete;
        Ok(self.completed)
    }
}

#[async_trait]
impl Waitable for JobHandle {
    type Output = bool;

    async fn poll(&mut self) -> Result<Resolution<bool>> {
        entity::reload(self.ctx.store.as_ref(), &mut self.job, PROGRESS_FIELDS).await?;
        if self.job.status == TaskStatus::Complete {
            Ok(Resolution::Resolved(true))
        } else {
            Ok(Resolution::Pending)
        }
    }

    async fn on_notification(&mut self, _body: &Value) -> Result<Resolution<bool>> {
        // completion is persisted before the marker is published
        self.poll().await
    }

    fn notify_enabled(&self) -> bool {
        self.job.notify
    }

    fn notification_channel(&self) -> String {
        self.channel_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::TaskhiveConfig;
    use crate::messaging::InMemoryQueue;
    use crate::store::{InMemoryEntityStore, InMemoryResultStore};
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryQueue>) {
        let queue = Arc::new(InMemoryQueue::new());
        let ctx = HiveContext::new(
            queue.clone(),
            Arc::new(InMemoryEntityStore::new()),
            Arc::new(InMemoryResultStore::default()),
            TaskhiveConfig::default(),
        );
        (Client::new(ctx), queue)
    }

    #[tokio::test]
    async fn test_add_task_does_not_enqueue() {
        let (client, queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        let handle = job
            .add_task("multiply", vec![json!(1), json!(2)], TaskOptions::default())
            .await
            .unwrap();

        assert_eq!(job.task_count(), 1);
        assert_eq!(handle.message().job_id(), Some(job.id()));
        assert_eq!(handle.status(), TaskStatus::New);
        assert_eq!(queue.published_count(), 0);
        assert_eq!(job.task_ids().await.unwrap(), vec![handle.id().to_string()]);

        // not persisted until enqueue
        let stored = client.job(job.id()).await.unwrap();
        assert_eq!(stored.task_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_tasks_freezes_count() {
        let (client, queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        for n in 0..3 {
            job.add_task("multiply", vec![json!(n)], TaskOptions::default())
                .await
                .unwrap();
        }
        let statuses = job.enqueue_tasks().await.unwrap();
        assert_eq!(statuses, vec![TaskStatus::Queued; 3]);
        assert_eq!(queue.ready_count("taskhive_new"), 3);
        assert!(queue
            .ready_bodies("taskhive_new")
            .iter()
            .all(|b| b["type"] == "jobtask" && b["job_id"] == job.id()));

        let stored = client.job(job.id()).await.unwrap();
        assert_eq!(stored.task_count(), 3);

        let err = job
            .add_task("multiply", vec![], TaskOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskhiveError::StateTransition(_)));
    }

    #[tokio::test]
    async fn test_subtask_enqueue_failure_is_recorded() {
        let (client, queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        let first = job.add_task("multiply", vec![], TaskOptions::default()).await.unwrap();
        job.add_task("multiply", vec![], TaskOptions::default()).await.unwrap();
        queue.fail_next_publishes(2);

        let statuses = job.enqueue_tasks().await.unwrap();
        assert_eq!(statuses, vec![TaskStatus::NotQueued, TaskStatus::Queued]);
        let mut first = client.task(first.id()).await.unwrap();
        assert_eq!(first.refresh_status().await.unwrap(), TaskStatus::NotQueued);
    }

    #[tokio::test]
    async fn test_empty_job_completes_on_enqueue() {
        let (client, _queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        assert!(job.enqueue_tasks().await.unwrap().is_empty());
        assert!(job.join(Some(Duration::ZERO)).await.unwrap());
        assert_eq!(job.status(), TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_second_enqueue_is_a_no_op() {
        let (client, queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        job.add_task("multiply", vec![json!(2)], TaskOptions::default())
            .await
            .unwrap();
        job.enqueue_tasks().await.unwrap();

        assert!(job.enqueue_tasks().await.unwrap().is_empty());
        assert_eq!(queue.ready_count("taskhive_new"), 1);
    }

    #[tokio::test]
    async fn test_foreign_handle_cannot_finalize_unenqueued_job() {
        let (client, queue) = client();
        let mut job = client.new_job(TaskOptions::notify()).await.unwrap();
        job.add_task("multiply", vec![json!(2)], TaskOptions::default())
            .await
            .unwrap();

        let mut other = client.job(job.id()).await.unwrap();
        let err = other.enqueue_tasks().await.unwrap_err();
        assert_eq!(err.kind(), "state_transition_error");
        assert_eq!(queue.published_count(), 0);

        let stored = client.job(job.id()).await.unwrap();
        assert_eq!(stored.status(), TaskStatus::New);
        assert_eq!(stored.task_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_times_out_without_workers() {
        let (client, _queue) = client();
        let mut job = client.new_job(TaskOptions::default()).await.unwrap();
        job.add_task("multiply", vec![], TaskOptions::default()).await.unwrap();
        job.enqueue_tasks().await.unwrap();

        let started = tokio::time::Instant::now();
        assert!(!job.join(Some(Duration::from_secs(3))).await.unwrap());
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(job.completed_task_count().await.unwrap(), 0);
    }
}
