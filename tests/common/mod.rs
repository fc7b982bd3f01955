//! Shared fixtures: in-memory adapters wired into one context, a standard
//! function registry and helpers for driving workers.

#![allow(dead_code)]

pub mod strategies;

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use taskhive::config::TaskhiveConfig;
use taskhive::messaging::InMemoryQueue;
use taskhive::store::{InMemoryEntityStore, InMemoryResultStore};
use taskhive::{Client, FunctionRegistry, HiveContext, MethodTable, Worker, WorkerOutcome};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Records the argument lists of every call to a registered function
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
}

impl CallLog {
    pub fn record(&self, args: Vec<Value>) {
        self.calls.lock().push(args);
    }

    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

pub struct TestHive {
    pub ctx: HiveContext,
    pub queue: Arc<InMemoryQueue>,
    pub store: Arc<InMemoryEntityStore>,
    pub results: Arc<InMemoryResultStore>,
    pub registry: Arc<FunctionRegistry>,
    pub client: Client,
    /// Calls to the `record` function
    pub recorded: CallLog,
}

impl TestHive {
    pub fn new() -> Self {
        Self::with_config(TaskhiveConfig::default())
    }

    /// Short poll interval for tests that run on the real clock
    pub fn fast() -> Self {
        let mut config = TaskhiveConfig::default();
        config.wait.poll_interval_ms = 10;
        Self::with_config(config)
    }

    pub fn with_config(config: TaskhiveConfig) -> Self {
        let queue = Arc::new(InMemoryQueue::new());
        let store = Arc::new(InMemoryEntityStore::new());
        let results = Arc::new(InMemoryResultStore::new(config.result_store.clone()));
        let ctx = HiveContext::new(queue.clone(), store.clone(), results.clone(), config);
        let recorded = CallLog::default();
        let registry = Arc::new(standard_registry(recorded.clone()));
        Self {
            client: Client::new(ctx.clone()),
            ctx,
            queue,
            store,
            results,
            registry,
            recorded,
        }
    }

    pub fn worker(&self) -> Worker {
        Worker::new(self.ctx.clone(), self.registry.clone())
    }

    /// Process messages until the intake channel is empty; returns the outcomes
    pub async fn drain(&self, worker: &mut Worker) -> Vec<WorkerOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match worker.process_next(Some(Duration::ZERO)).await.unwrap() {
                WorkerOutcome::Idle => return outcomes,
                outcome => outcomes.push(outcome),
            }
        }
    }

    /// Run `count` worker loops in the background until the returned sender flips
    pub fn spawn_workers(&self, count: usize) -> WorkerPool {
        let (shutdown, receiver) = watch::channel(false);
        let handles = (0..count)
            .map(|_| {
                let mut worker = self.worker();
                let receiver = receiver.clone();
                tokio::spawn(async move { worker.run(receiver).await.unwrap() })
            })
            .collect();
        WorkerPool { shutdown, handles }
    }
}

pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<u64>>,
}

impl WorkerPool {
    /// Stop every worker and return the total number of messages processed
    pub async fn stop(self) -> u64 {
        self.shutdown.send(true).ok();
        let mut processed = 0;
        for handle in self.handles {
            processed += handle.await.unwrap();
        }
        processed
    }
}

/// `multiply`, `math.multiply`, plus functions that fail in each supported way
pub fn standard_registry(recorded: CallLog) -> FunctionRegistry {
    let registry = FunctionRegistry::new();
    registry.register_sync("multiply", taskhive::worker::multiply);
    registry.register_sync("fail", |_| Err(anyhow::anyhow!("deliberate failure")));
    registry.register_sync("explode", |_| panic!("deliberate panic"));
    registry.register("hang", |_| async {
        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        Ok::<_, anyhow::Error>(Value::Null)
    });
    registry.register_sync("record", move |args| {
        recorded.record(args.clone());
        Ok(Value::Array(args))
    });
    registry.register_object(
        "math",
        MethodTable::new().sync_method("multiply", taskhive::worker::multiply),
    );
    registry
}
