//! # Job Completion Accounting
//!
//! Fan-in side of a job. Each finished subtask increments the job's
//! `completed_task_count` through the store's atomic increment; the worker whose
//! increment returns exactly `task_count` completes the job. No lock spans the
//! read and the check: the increment is the only synchronization point.
//!
//! Completing a job is itself claimed through a second counter, so the
//! callback and notification go out once even when an empty-job finalize and
//! the last subtask race for the same job.

use crate::client::hive_client::enqueue_task;
use crate::constants::{entity_types, fields, JOB_COMPLETE_MARKER};
use crate::context::HiveContext;
use crate::error::Result;
use crate::logging::log_job_operation;
use crate::messaging::enqueue_with_retry;
use crate::models::{entity, entity_key, Entity, Job, TaskMessage};
use crate::state_machine::TaskStatus;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Count one finished subtask toward `job_id`; returns whether this call completed the job
pub async fn on_subtask_complete(ctx: &HiveContext, job_id: &str) -> Result<bool> {
    let store = ctx.store.as_ref();
    let mut job = Job::find_by_id(store, job_id).await?;

    let completed = entity::increment(store, &job, fields::COMPLETED_TASK_COUNT).await?;
    job.completed_task_count = completed;
    log_job_operation(
        "subtask_complete",
        &job.id,
        Some(job.task_count),
        Some(completed),
        job.status.as_str(),
    );

    if completed != job.task_count {
        return Ok(false);
    }
    finish_job(ctx, &mut job).await
}

/// Mark `job` complete, enqueue its callback and publish its notification
///
/// Returns false without side effects when the job was already completed.
pub(crate) async fn finish_job(ctx: &HiveContext, job: &mut Job) -> Result<bool> {
    let store = ctx.store.as_ref();
    let claims = entity::increment(store, job, fields::COMPLETION_CLAIMS).await?;
    if claims != 1 {
        warn!(job_id = %job.id, claims, "⚠️ Job already completed, skipping callback and notification");
        return Ok(false);
    }

    job.status = TaskStatus::Complete;
    entity::save_fields(store, job, &[fields::STATUS]).await?;
    log_job_operation(
        "complete",
        &job.id,
        Some(job.task_count),
        Some(job.completed_task_count),
        job.status.as_str(),
    );

    if let Some(callback) = job.callback.clone() {
        let args = vec![json!(job.id), Value::Array(subtask_results(ctx, job).await?)];
        let mut task = TaskMessage::create(store, callback, args, false, None).await?;
        let status = enqueue_task(ctx, &mut task).await?;
        info!(job_id = %job.id, callback_task_id = %task.id, status = %status, "📞 Job callback enqueued");
    }

    if job.notify {
        let mut body = job.to_message_body();
        body["event"] = json!(JOB_COMPLETE_MARKER);
        let channel = job.channel_name();
        if enqueue_with_retry(ctx.queue.as_ref(), &channel, &body).await.is_none() {
            warn!(job_id = %job.id, channel = %channel, "⚠️ Job completion notification was not delivered");
        }
    }
    Ok(true)
}

/// `[subtask id, result locator]` pairs, ordered by subtask id
async fn subtask_results(ctx: &HiveContext, job: &Job) -> Result<Vec<Value>> {
    let store = ctx.store.as_ref();
    let mut pairs = Vec::new();
    for task_id in job.task_ids(store).await? {
        let locator = store
            .get_field(&entity_key(entity_types::JOB_TASK, &task_id), fields::RESULT_LOCATOR)
            .await?;
        pairs.push(json!([task_id, locator]));
    }
    Ok(pairs)
}
