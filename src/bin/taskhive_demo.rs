//! # Taskhive Demo
//!
//! Runs the multiply scenarios against in-memory adapters: a single task
//! waited on by polling, then a three-subtask job joined by a client while a
//! pool of workers drains the queue.

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use taskhive::logging::init_structured_logging;
use taskhive::prelude::*;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "taskhive-demo")]
#[command(about = "Run the multiply task and job scenarios in-process")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML configuration file (TASKHIVE_* environment variables still apply)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 2)]
    workers: usize,

    /// Wait on notification channels instead of polling
    #[arg(short, long)]
    notify: bool,

    /// Seconds to wait for each scenario
    #[arg(short, long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match TaskhiveConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            process::exit(1);
        }
    };
    init_structured_logging(config.logging.json);

    if let Err(e) = run(cli, config).await {
        error!(error = %e, "❌ Demo failed");
        process::exit(1);
    }
}

async fn run(cli: Cli, config: TaskhiveConfig) -> taskhive::Result<()> {
    let ctx = HiveContext::in_memory(config)?;
    let timeout = Some(Duration::from_secs(cli.timeout));
    let options = TaskOptions::default().with_notify(cli.notify);

    let registry = Arc::new(FunctionRegistry::new());
    registry.register_sync("multiply", multiply);
    registry.register_object("math", MethodTable::new().sync_method("multiply", multiply));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers: Vec<_> = (0..cli.workers.max(1))
        .map(|_| {
            let mut worker = Worker::new(ctx.clone(), registry.clone());
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { worker.run(shutdown).await })
        })
        .collect();

    let client = Client::new(ctx);

    let mut task = client
        .submit_task("multiply", vec![json!(4), json!(5), json!(6)], options.clone())
        .await?;
    let value = task.value(timeout).await?;
    info!(task_id = %task.id(), value = ?value, status = %task.status(), "🧮 multiply(4, 5, 6)");

    let mut job = run_job(&client, options, timeout).await?;
    let completed = job.completed_task_count().await?;
    info!(job_id = %job.id(), status = %job.status(), completed, "🧺 Job joined");

    shutdown_tx.send(true).ok();
    for handle in workers {
        match handle.await {
            Ok(Ok(processed)) => info!(processed, "✅ Worker finished"),
            Ok(Err(e)) => error!(error = %e, "❌ Worker failed"),
            Err(e) => error!(error = %e, "❌ Worker task panicked"),
        }
    }
    Ok(())
}

/// Fan out three `math.multiply` subtasks and join the job
///
/// `options` (and so `--notify`) apply to the job; subtasks report only
/// through the join.
async fn run_job(
    client: &Client,
    options: TaskOptions,
    timeout: Option<Duration>,
) -> taskhive::Result<JobHandle> {
    let mut job = client.new_job(options).await?;
    for args in [[1, 2, 3], [4, 5, 6], [7, 8, 9]] {
        let args = args.iter().map(|n| json!(n)).collect();
        job.add_task("math.multiply", args, TaskOptions::default()).await?;
    }
    job.enqueue_tasks().await?;
    job.join(timeout).await?;
    Ok(job)
}
