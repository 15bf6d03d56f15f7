//! 扇出：无负载的元任务枚举父资源，为每个父资源入队一个子任务

use inventory_core::{
    models::{Task, TaskOptions},
    traits::TaskQueue,
};
use serde::Serialize;
use tracing::{info, warn};

use inventory_infrastructure::observability::{StructuredLogger, TaskMetrics};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FanOutReport {
    pub enqueued: usize,
    pub failed: usize,
}

fn child_options(options: &TaskOptions) -> TaskOptions {
    TaskOptions {
        // 子任务各自生成 id
        task_id: None,
        ..options.clone()
    }
}

async fn enqueue_child(queue: &dyn TaskQueue, task: Task, source: &str, report: &mut FanOutReport) {
    let name = task.name.clone();
    match queue.enqueue(task).await {
        Ok(info) => {
            StructuredLogger::log_task_enqueued(&info, source);
            TaskMetrics.record_enqueued(&info.name, &info.queue);
            report.enqueued += 1;
        }
        Err(e) => {
            warn!(task.name = %name, fan_out.source = source, error = %e, "子任务入队失败，跳过");
            report.failed += 1;
        }
    }
}

/// 为每个父资源负载入队一个 `child` 任务
///
/// 单个负载序列化或入队失败只记日志并跳过，其余父资源照常入队。
pub async fn fan_out<T, I>(
    queue: &dyn TaskQueue,
    source: &str,
    child: &str,
    payloads: I,
    options: &TaskOptions,
) -> FanOutReport
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut report = FanOutReport::default();

    for payload in payloads {
        let bytes = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(task.name = child, fan_out.source = source, error = %e, "子任务负载序列化失败，跳过");
                report.failed += 1;
                continue;
            }
        };
        let task = Task {
            name: child.to_string(),
            payload: bytes,
            options: child_options(options),
        };
        enqueue_child(queue, task, source, &mut report).await;
    }

    info!(
        fan_out.source = source,
        task.name = child,
        enqueued = report.enqueued,
        failed = report.failed,
        "扇出完成"
    );
    report
}

/// 入队一组无负载任务，用于 `*:collect-all` 这类聚合任务
pub async fn enqueue_all(
    queue: &dyn TaskQueue,
    source: &str,
    names: &[&str],
    options: &TaskOptions,
) -> FanOutReport {
    let mut report = FanOutReport::default();
    for name in names {
        let task = Task {
            name: (*name).to_string(),
            payload: Vec::new(),
            options: child_options(options),
        };
        enqueue_child(queue, task, source, &mut report).await;
    }
    report
}
