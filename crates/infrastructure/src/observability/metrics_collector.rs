//! Process-level counters and histograms recorded through the `metrics` facade

use std::time::Duration;

use metrics::{counter, histogram};

pub const TASK_SUCCESS_TOTAL: &str = "inventory_task_success_total";
pub const TASK_FAILED_TOTAL: &str = "inventory_task_failed_total";
pub const TASK_SKIPPED_TOTAL: &str = "inventory_task_skipped_total";
pub const TASK_DURATION_SECONDS: &str = "inventory_task_duration_seconds";
pub const TASKS_ENQUEUED_TOTAL: &str = "inventory_tasks_enqueued_total";
pub const PERIODIC_ENQUEUE_FAILURES_TOTAL: &str = "inventory_periodic_enqueue_failures_total";
pub const SESSION_REFRESH_TOTAL: &str = "inventory_session_refresh_total";

/// 任务执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// 瞬时失败，将被重试
    Failed,
    /// 永久失败，不再重试
    Skipped,
}

impl TaskOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskOutcome::Success => "success",
            TaskOutcome::Failed => "failed",
            TaskOutcome::Skipped => "skipped",
        }
    }
}

/// Task execution metrics
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskMetrics;

impl TaskMetrics {
    /// Record one finished task invocation
    pub fn record_task(&self, task_name: &str, queue: &str, outcome: TaskOutcome, elapsed: Duration) {
        let name = match outcome {
            TaskOutcome::Success => TASK_SUCCESS_TOTAL,
            TaskOutcome::Failed => TASK_FAILED_TOTAL,
            TaskOutcome::Skipped => TASK_SKIPPED_TOTAL,
        };
        counter!(name, "task" => task_name.to_string(), "queue" => queue.to_string()).increment(1);
        histogram!(
            TASK_DURATION_SECONDS,
            "task" => task_name.to_string(),
            "outcome" => outcome.as_str()
        )
        .record(elapsed.as_secs_f64());
    }

    pub fn record_enqueued(&self, task_name: &str, queue: &str) {
        counter!(TASKS_ENQUEUED_TOTAL, "task" => task_name.to_string(), "queue" => queue.to_string())
            .increment(1);
    }

    pub fn record_periodic_enqueue_failure(&self, task_name: &str) {
        counter!(PERIODIC_ENQUEUE_FAILURES_TOTAL, "task" => task_name.to_string()).increment(1);
    }
}

pub fn record_session_refresh(session: &str, success: bool) {
    counter!(
        SESSION_REFRESH_TOTAL,
        "session" => session.to_string(),
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
}
