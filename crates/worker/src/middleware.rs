//! 包裹每次任务调用的中间件链
//!
//! 中间件本身也是 [`TaskHandler`]，按注册顺序由外到内包裹分发处理器。

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use inventory_core::{models::TaskInfo, traits::TaskHandler, InventoryResult};
use inventory_infrastructure::observability::{StructuredLogger, TaskMetrics, TaskOutcome};
use tracing::{debug, info_span, Instrument};

pub type Middleware = fn(Arc<dyn TaskHandler>) -> Arc<dyn TaskHandler>;

/// `middlewares[0]` 位于最外层
pub fn chain(handler: Arc<dyn TaskHandler>, middlewares: &[Middleware]) -> Arc<dyn TaskHandler> {
    middlewares
        .iter()
        .rev()
        .fold(handler, |inner, middleware| middleware(inner))
}

/// 默认链：日志 span 在外，指标在内
pub fn default_middlewares() -> Vec<Middleware> {
    vec![LoggingMiddleware::wrap, MetricsMiddleware::wrap]
}

/// 为每次调用建立带任务 id、名称和队列的 span，并记录结果
pub struct LoggingMiddleware {
    inner: Arc<dyn TaskHandler>,
}

impl LoggingMiddleware {
    pub fn wrap(inner: Arc<dyn TaskHandler>) -> Arc<dyn TaskHandler> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl TaskHandler for LoggingMiddleware {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let span = info_span!(
            "task",
            task.id = %task.id,
            task.name = %task.name,
            task.queue = %task.queue,
            task.retried = task.retried,
        );

        async {
            debug!("开始执行任务");
            let start = Instant::now();
            let result = self.inner.handle(task).await;
            match &result {
                Ok(()) => StructuredLogger::log_task_completed(task, start.elapsed()),
                Err(e) if e.is_permanent() => {
                    StructuredLogger::log_task_skipped(task, e.kind(), &e.to_string())
                }
                Err(e) => {
                    StructuredLogger::log_task_failed(task, e.kind(), &e.to_string(), start.elapsed())
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// 记录耗时与 success/failed/skipped 计数
pub struct MetricsMiddleware {
    inner: Arc<dyn TaskHandler>,
    metrics: TaskMetrics,
}

impl MetricsMiddleware {
    pub fn wrap(inner: Arc<dyn TaskHandler>) -> Arc<dyn TaskHandler> {
        Arc::new(Self {
            inner,
            metrics: TaskMetrics,
        })
    }
}

#[async_trait]
impl TaskHandler for MetricsMiddleware {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let start = Instant::now();
        let result = self.inner.handle(task).await;
        let outcome = match &result {
            Ok(()) => TaskOutcome::Success,
            Err(e) if e.is_permanent() => TaskOutcome::Skipped,
            Err(_) => TaskOutcome::Failed,
        };
        self.metrics
            .record_task(&task.name, &task.queue, outcome, start.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use std::sync::Mutex;

    static ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct Tag {
        name: &'static str,
        inner: Arc<dyn TaskHandler>,
    }

    #[async_trait]
    impl TaskHandler for Tag {
        async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
            ORDER.lock().unwrap().push(self.name);
            self.inner.handle(task).await
        }
    }

    fn outer(inner: Arc<dyn TaskHandler>) -> Arc<dyn TaskHandler> {
        Arc::new(Tag { name: "outer", inner })
    }

    fn inner(inner: Arc<dyn TaskHandler>) -> Arc<dyn TaskHandler> {
        Arc::new(Tag { name: "inner", inner })
    }

    #[tokio::test]
    async fn test_chain_order_first_is_outermost() {
        let handler = chain(
            handler_fn(|_task| async {
                ORDER.lock().unwrap().push("handler");
                Ok(())
            }),
            &[outer, inner],
        );

        let task = crate::test_support::task("g:collect-seeds", b"");
        handler.handle(&task).await.unwrap();
        assert_eq!(*ORDER.lock().unwrap(), vec!["outer", "inner", "handler"]);
    }
}
