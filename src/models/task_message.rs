//! # Task Messages
//!
//! The unit of work. A task message is persisted as an entity (status and
//! result locator are read back from there) and its JSON form is the body of
//! the queue message a worker reserves.

use crate::constants::{entity_types, fields, message_types};
use crate::error::{Result, TaskhiveError};
use crate::models::entity::{self, parse_bool, Entity};
use crate::models::function_ref::FunctionRef;
use crate::models::result_locator::ResultLocator;
use crate::state_machine::{TaskEvent, TaskStatus};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const STANDALONE_FIELDS: &[&str] = &[
    fields::TYPE,
    fields::FN,
    fields::ARGS,
    fields::CALLBACK,
    fields::NOTIFY,
    fields::STATUS,
    fields::RESULT_LOCATOR,
    fields::ERROR,
];

const SUBTASK_FIELDS: &[&str] = &[
    fields::TYPE,
    fields::FN,
    fields::ARGS,
    fields::CALLBACK,
    fields::NOTIFY,
    fields::STATUS,
    fields::RESULT_LOCATOR,
    fields::ERROR,
    fields::JOB_ID,
];

/// Standalone task or job subtask; serialized as the `type` discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskKind {
    #[serde(rename = "task")]
    Standalone,
    /// Belongs to exactly one job, fixed at creation
    #[serde(rename = "jobtask")]
    Subtask { job_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: String,
    #[serde(flatten)]
    pub kind: TaskKind,
    /// Raw function reference; parsed by the worker at resolution time
    #[serde(rename = "fn")]
    pub function: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub result_locator: Option<ResultLocator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskMessage {
    /// New standalone task in status `New`
    pub fn new(
        function: impl Into<String>,
        args: Vec<Value>,
        notify: bool,
        callback: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: TaskKind::Standalone,
            function: function.into(),
            args,
            callback,
            notify,
            status: TaskStatus::New,
            result_locator: None,
            error: None,
        }
    }

    /// New subtask of `job_id` in status `New`
    pub fn new_subtask(
        job_id: impl Into<String>,
        function: impl Into<String>,
        args: Vec<Value>,
        notify: bool,
        callback: Option<String>,
    ) -> Self {
        Self {
            kind: TaskKind::Subtask {
                job_id: job_id.into(),
            },
            ..Self::new(function, args, notify, callback)
        }
    }

    fn blank(id: &str, kind: TaskKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            function: String::new(),
            args: Vec::new(),
            callback: None,
            notify: false,
            status: TaskStatus::New,
            result_locator: None,
            error: None,
        }
    }

    /// Create and persist a standalone task
    pub async fn create(
        store: &dyn EntityStore,
        function: impl Into<String>,
        args: Vec<Value>,
        notify: bool,
        callback: Option<String>,
    ) -> Result<Self> {
        let task = Self::new(function, args, notify, callback);
        entity::save(store, &task).await?;
        Ok(task)
    }

    /// Load a task by id, whichever variant it was created as
    pub async fn find_by_id(store: &dyn EntityStore, id: &str) -> Result<Self> {
        match entity::load(store, Self::blank(id, TaskKind::Standalone)).await {
            Err(TaskhiveError::EntityNotFound(_)) => {
                let subtask = TaskKind::Subtask {
                    job_id: String::new(),
                };
                entity::load(store, Self::blank(id, subtask)).await
            }
            other => other,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Standalone => None,
            TaskKind::Subtask { job_id } => Some(job_id),
        }
    }

    pub fn message_type(&self) -> &'static str {
        match self.kind {
            TaskKind::Standalone => message_types::SIMPLE_TASK,
            TaskKind::Subtask { .. } => message_types::JOB_TASK,
        }
    }

    pub fn function_ref(&self) -> Result<FunctionRef> {
        self.function.parse()
    }

    /// Apply a lifecycle event to the local copy; failures record their reason
    pub fn apply(&mut self, event: &TaskEvent) -> Result<TaskStatus> {
        self.status = self.status.transition(event)?;
        if let Some(reason) = event.error_message() {
            self.error = Some(reason.to_string());
        }
        Ok(self.status)
    }

    /// JSON body published to queues
    pub fn to_message_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_message_body(body: &Value) -> Result<Self> {
        Ok(serde_json::from_value(body.clone())?)
    }
}

impl Entity for TaskMessage {
    fn fields(&self) -> &'static [&'static str] {
        match self.kind {
            TaskKind::Standalone => STANDALONE_FIELDS,
            TaskKind::Subtask { .. } => SUBTASK_FIELDS,
        }
    }

    fn type_name(&self) -> &'static str {
        match self.kind {
            TaskKind::Standalone => entity_types::SIMPLE_TASK,
            TaskKind::Subtask { .. } => entity_types::JOB_TASK,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn field_value(&self, field: &str) -> Result<Option<String>> {
        let value = match field {
            fields::TYPE => Some(self.message_type().to_string()),
            fields::FN => Some(self.function.clone()),
            fields::ARGS => Some(serde_json::to_string(&self.args)?),
            fields::CALLBACK => self.callback.clone(),
            fields::NOTIFY => Some(self.notify.to_string()),
            fields::STATUS => Some(self.status.to_string()),
            fields::RESULT_LOCATOR => self.result_locator.as_ref().map(ToString::to_string),
            fields::ERROR => self.error.clone(),
            fields::JOB_ID => self.job_id().map(str::to_string),
            _ => None,
        };
        Ok(value)
    }

    fn assign_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            fields::FN => self.function = value.to_string(),
            fields::ARGS => self.args = serde_json::from_str(value)?,
            fields::CALLBACK => self.callback = Some(value.to_string()),
            fields::NOTIFY => self.notify = parse_bool(field, value)?,
            fields::STATUS => self.status = value.parse()?,
            fields::RESULT_LOCATOR => self.result_locator = Some(value.parse()?),
            fields::ERROR => self.error = Some(value.to_string()),
            fields::JOB_ID => {
                if let TaskKind::Subtask { job_id } = &mut self.kind {
                    *job_id = value.to_string();
                }
            }
            // the variant is fixed by whoever built the blank entity
            _ => {}
        }
        Ok(())
    }
}
