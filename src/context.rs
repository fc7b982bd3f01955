//! # Hive Context
//!
//! Shared adapters and configuration handed to clients, workers and handles.
//! Cloning is cheap: everything is behind an `Arc`.

use crate::config::TaskhiveConfig;
use crate::error::Result;
use crate::messaging::{InMemoryQueue, MessageQueue, QueueSession};
use crate::store::{EntityStore, InMemoryEntityStore, InMemoryResultStore, ResultStore};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Dependency container for one process
#[derive(Clone)]
pub struct HiveContext {
    /// Identifies this process in logs
    pub system_id: Uuid,
    pub queue: Arc<dyn MessageQueue>,
    pub store: Arc<dyn EntityStore>,
    pub results: Arc<dyn ResultStore>,
    pub config: Arc<TaskhiveConfig>,
}

impl std::fmt::Debug for HiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiveContext")
            .field("system_id", &self.system_id)
            .field("queue", &self.queue.backend_name())
            .field("store", &"Arc<dyn EntityStore>")
            .field("results", &"Arc<dyn ResultStore>")
            .finish()
    }
}

impl HiveContext {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn EntityStore>,
        results: Arc<dyn ResultStore>,
        config: TaskhiveConfig,
    ) -> Self {
        let system_id = Uuid::new_v4();
        info!(
            system_id = %system_id,
            queue_backend = queue.backend_name(),
            "🔧 HiveContext initialized"
        );
        Self {
            system_id,
            queue,
            store,
            results,
            config: Arc::new(config),
        }
    }

    /// Fully in-process context, after validating `config`
    pub fn in_memory(config: TaskhiveConfig) -> Result<Self> {
        config.validate()?;
        let results = InMemoryResultStore::new(config.result_store.clone());
        Ok(Self::new(
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryEntityStore::new()),
            Arc::new(results),
            config,
        ))
    }

    /// Fresh queue session over the shared queue
    pub fn session(&self) -> QueueSession {
        QueueSession::new(self.queue.clone())
    }
}
