//! # Jobs
//!
//! A job groups subtasks. `task_count` is fixed when the job is finalized and
//! `completed_task_count` only ever moves through atomic increments on the
//! store, so neither is rewritten by a whole-entity save after creation.

use crate::constants::{entity_types, fields, message_types, relations};
use crate::error::Result;
use crate::models::entity::{self, parse_bool, parse_i64, Entity, Relation};
use crate::state_machine::TaskStatus;
use crate::store::EntityStore;
use serde_json::{json, Value};
use uuid::Uuid;

const JOB_FIELDS: &[&str] = &[
    fields::TYPE,
    fields::STATUS,
    fields::CALLBACK,
    fields::NOTIFY,
    fields::TASK_COUNT,
    fields::COMPLETED_TASK_COUNT,
];

/// Job has-many subtasks; each subtask carries `job_id`
pub const JOB_TASKS: Relation = Relation {
    name: relations::JOB_TASKS,
    owner_type: entity_types::JOB,
    member_type: entity_types::JOB_TASK,
    foreign_key: fields::JOB_ID,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: TaskStatus,
    pub callback: Option<String>,
    pub notify: bool,
    pub task_count: i64,
    pub completed_task_count: i64,
}

impl Job {
    pub fn new(notify: bool, callback: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: TaskStatus::New,
            callback,
            notify,
            task_count: 0,
            completed_task_count: 0,
        }
    }

    fn blank(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::new(false, None)
        }
    }

    /// Create and persist a job with no subtasks
    pub async fn create(
        store: &dyn EntityStore,
        notify: bool,
        callback: Option<String>,
    ) -> Result<Self> {
        let job = Self::new(notify, callback);
        entity::save(store, &job).await?;
        Ok(job)
    }

    pub async fn find_by_id(store: &dyn EntityStore, id: &str) -> Result<Self> {
        entity::load(store, Self::blank(id)).await
    }

    /// Ids of the subtasks attached so far
    pub async fn task_ids(&self, store: &dyn EntityStore) -> Result<Vec<String>> {
        let members = store.members_of(&JOB_TASKS.set_key(&self.id)).await?;
        Ok(members.into_iter().collect())
    }

    pub async fn attach_task(&self, store: &dyn EntityStore, task_id: &str) -> Result<()> {
        store.add_to_set(&JOB_TASKS.set_key(&self.id), task_id).await
    }

    /// Body published to the job's notification channel
    pub fn to_message_body(&self) -> Value {
        json!({
            "type": message_types::JOB,
            "id": self.id,
            "status": self.status,
            "task_count": self.task_count,
            "completed_task_count": self.completed_task_count,
        })
    }
}

impl Entity for Job {
    fn fields(&self) -> &'static [&'static str] {
        JOB_FIELDS
    }

    fn type_name(&self) -> &'static str {
        entity_types::JOB
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn field_value(&self, field: &str) -> Result<Option<String>> {
        Ok(match field {
            fields::TYPE => Some(message_types::JOB.to_string()),
            fields::STATUS => Some(self.status.to_string()),
            fields::CALLBACK => self.callback.clone(),
            fields::NOTIFY => Some(self.notify.to_string()),
            fields::TASK_COUNT => Some(self.task_count.to_string()),
            fields::COMPLETED_TASK_COUNT => Some(self.completed_task_count.to_string()),
            _ => None,
        })
    }

    fn assign_field(&mut self, field: &str, value: &str) -> Result<()> {
        match field {
            fields::STATUS => self.status = value.parse()?,
            fields::CALLBACK => self.callback = Some(value.to_string()),
            fields::NOTIFY => self.notify = parse_bool(field, value)?,
            fields::TASK_COUNT => self.task_count = parse_i64(field, value)?,
            fields::COMPLETED_TASK_COUNT => self.completed_task_count = parse_i64(field, value)?,
            _ => {}
        }
        Ok(())
    }
}
