//! # Logging
//!
//! One-time `tracing` subscriber setup for binaries, and the two structured
//! events every task and job lifecycle step is reported through.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

static SUBSCRIBER: OnceLock<()> = OnceLock::new();

/// Install the global subscriber, plain text or JSON
///
/// The level follows `TASKHIVE_ENV` (`production` logs at `info`, anything else
/// at `debug`) unless `RUST_LOG` is set. Later calls do nothing.
pub fn init_structured_logging(json: bool) {
    SUBSCRIBER.get_or_init(|| {
        let deployment = deployment_env();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(&deployment)));

        let output = fmt::layer().with_target(true).with_thread_ids(true);
        let layer = if json {
            output.json().with_filter(filter).boxed()
        } else {
            output.with_ansi(true).with_filter(filter).boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            // a test harness or embedding application got there first
            tracing::debug!("tracing subscriber already installed");
        }
        tracing::info!(
            pid = std::process::id(),
            deployment = %deployment,
            json,
            "🔧 Logging initialized"
        );
    });
}

fn deployment_env() -> String {
    std::env::var("TASKHIVE_ENV").unwrap_or_else(|_| "development".to_string())
}

fn default_level(deployment: &str) -> &'static str {
    if deployment == "production" {
        "info"
    } else {
        "debug"
    }
}

/// One task lifecycle step: create, enqueue, start, complete, fail, acknowledge
pub fn log_task_operation(
    operation: &str,
    task_id: &str,
    function: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        function = function,
        status = %status,
        details = details,
        at = %Utc::now().to_rfc3339(),
        "📋 TASK"
    );
}

/// One job lifecycle step, with its counters when known
pub fn log_job_operation(
    operation: &str,
    job_id: &str,
    task_count: Option<i64>,
    completed_task_count: Option<i64>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        job_id = %job_id,
        task_count = task_count,
        completed_task_count = completed_task_count,
        status = %status,
        at = %Utc::now().to_rfc3339(),
        "🧺 JOB"
    );
}
