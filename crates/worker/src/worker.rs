use std::sync::Arc;
use std::time::Duration;

use inventory_core::{
    config::WorkerConfig,
    models::{TaskInfo, TaskState},
    traits::{TaskHandler, TaskQueue, TaskRegistry},
    InventoryError, InventoryResult,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dispatch::DispatchHandler;
use crate::middleware::{chain, default_middlewares, Middleware};

/// 有界并发的任务执行循环
///
/// 每个并发槽对应一个信号量许可：拿到许可后才从队列租用任务，执行结束归还。
pub struct Worker {
    queue: Arc<dyn TaskQueue>,
    handler: Arc<dyn TaskHandler>,
    task_names: Vec<String>,
    queues: Vec<String>,
    concurrency: usize,
    poll_interval: Duration,
    shutdown_timeout: Duration,
}

impl Worker {
    /// 绑定注册表中的全部处理器，并套上默认中间件链
    pub fn new(queue: Arc<dyn TaskQueue>, registry: &TaskRegistry, config: &WorkerConfig) -> Self {
        Self::with_middlewares(queue, registry, config, &default_middlewares())
    }

    pub fn with_middlewares(
        queue: Arc<dyn TaskQueue>,
        registry: &TaskRegistry,
        config: &WorkerConfig,
        middlewares: &[Middleware],
    ) -> Self {
        let dispatch = DispatchHandler::bind(registry);
        let task_names = dispatch.task_names();
        Self {
            queue,
            handler: chain(Arc::new(dispatch), middlewares),
            task_names,
            queues: config.queues.clone(),
            concurrency: config.effective_concurrency(),
            poll_interval: config.poll_interval(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    pub fn task_names(&self) -> &[String] {
        &self.task_names
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 在当前任务中租用并执行一个任务，队列为空时返回 `None`
    pub async fn run_once(&self) -> InventoryResult<Option<TaskState>> {
        match self.queue.dequeue(&self.queues).await? {
            Some(task) => Ok(Some(
                process(self.queue.clone(), self.handler.clone(), task).await,
            )),
            None => Ok(None),
        }
    }

    /// 运行到取消令牌触发为止；随后等待在途任务，超过宽限期则强制中止
    pub async fn run(self, cancel: CancellationToken) -> InventoryResult<()> {
        info!(
            concurrency = self.concurrency,
            queues = ?self.queues,
            tasks = self.task_names.len(),
            "Worker已启动"
        );

        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut running = JoinSet::new();

        loop {
            while let Some(joined) = running.try_join_next() {
                if let Err(e) = joined {
                    error!(error = %e, "任务执行单元异常退出");
                }
            }

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = slots.clone().acquire_owned() => permit
                    .map_err(|e| InventoryError::Internal(format!("并发槽已关闭: {e}")))?,
            };
            if cancel.is_cancelled() {
                break;
            }

            match self.queue.dequeue(&self.queues).await {
                Ok(Some(task)) => {
                    let queue = self.queue.clone();
                    let handler = self.handler.clone();
                    running.spawn(async move {
                        process(queue, handler, task).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    self.idle(&cancel).await;
                }
                Err(e) => {
                    drop(permit);
                    warn!(error = %e, "从队列租用任务失败");
                    self.idle(&cancel).await;
                }
            }
        }

        info!(in_flight = running.len(), "Worker停止接收新任务，等待在途任务完成");
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while running.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = running.len(),
                grace_secs = self.shutdown_timeout.as_secs(),
                "宽限期已过，中止剩余任务"
            );
            running.abort_all();
            while running.join_next().await.is_some() {}
        }

        info!("Worker已停止");
        Ok(())
    }

    async fn idle(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }
}

/// 执行任务并向队列报告结果，返回任务的新状态
async fn process(
    queue: Arc<dyn TaskQueue>,
    handler: Arc<dyn TaskHandler>,
    task: TaskInfo,
) -> TaskState {
    match handler.handle(&task).await {
        Ok(()) => match queue.complete(&task.id).await {
            Ok(()) => TaskState::Completed,
            Err(e) => {
                error!(task.id = %task.id, error = %e, "确认任务完成失败");
                TaskState::Active
            }
        },
        Err(e) => {
            let retryable = !e.is_permanent();
            match queue.fail(&task.id, &e.to_string(), retryable).await {
                Ok(state) => state,
                Err(report_err) => {
                    error!(task.id = %task.id, error = %report_err, "报告任务失败时出错");
                    TaskState::Active
                }
            }
        }
    }
}
