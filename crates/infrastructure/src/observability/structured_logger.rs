//! Structured logging utilities
//!
//! Well-known events share field names so that log pipelines can filter on `event`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use inventory_core::models::TaskInfo;
use tracing::{debug, error, info, warn};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log task enqueue
    pub fn log_task_enqueued(task: &TaskInfo, source: &str) {
        info!(
            event = "task_enqueued",
            task.id = %task.id,
            task.name = %task.name,
            task.queue = %task.queue,
            task.state = %task.state,
            source = source,
            "Task enqueued"
        );
    }

    pub fn log_task_completed(task: &TaskInfo, elapsed: Duration) {
        info!(
            event = "task_completed",
            task.id = %task.id,
            task.name = %task.name,
            task.queue = %task.queue,
            duration_ms = elapsed.as_millis() as u64,
            "Task completed"
        );
    }

    /// Transient failure, the broker will retry
    pub fn log_task_failed(task: &TaskInfo, error_kind: &str, message: &str, elapsed: Duration) {
        warn!(
            event = "task_failed",
            task.id = %task.id,
            task.name = %task.name,
            task.queue = %task.queue,
            task.retried = task.retried,
            task.max_retry = task.max_retry,
            error.kind = error_kind,
            error.message = message,
            duration_ms = elapsed.as_millis() as u64,
            "Task failed"
        );
    }

    /// Permanent failure, archived without retry
    pub fn log_task_skipped(task: &TaskInfo, error_kind: &str, message: &str) {
        error!(
            event = "task_skipped",
            task.id = %task.id,
            task.name = %task.name,
            task.queue = %task.queue,
            error.kind = error_kind,
            error.message = message,
            "Task archived without retry"
        );
    }

    pub fn log_periodic_job_fired(spec: &str, task_name: &str, queue: &str, task_id: &str) {
        info!(
            event = "periodic_job_fired",
            periodic.spec = spec,
            task.name = task_name,
            task.queue = queue,
            task.id = task_id,
            "Periodic job fired"
        );
    }

    pub fn log_session_refreshed(name: &str, method: &str, expires_at: DateTime<Utc>) {
        info!(
            event = "session_refreshed",
            session.name = name,
            session.method = method,
            session.expires_at = %expires_at,
            "Session refreshed"
        );
    }

    pub fn log_link_pass_completed(link: &str, inserted: u64, updated: u64) {
        info!(
            event = "link_pass_completed",
            link.name = link,
            link.inserted = inserted,
            link.updated = updated,
            "Link pass completed"
        );
    }

    pub fn log_collection_completed(task_name: &str, partition: &str, fetched: usize, written: u64) {
        debug!(
            event = "collection_completed",
            task.name = task_name,
            partition = partition,
            fetched = fetched,
            written = written,
            "Collection completed"
        );
    }
}
