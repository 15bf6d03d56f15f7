use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use inventory_core::{models::TaskInfo, traits::TaskHandler, InventoryResult};

/// 用闭包实现的处理器
pub struct FnHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F, Fut>
where
    F: Fn(TaskInfo) -> Fut + Send + Sync,
    Fut: Future<Output = InventoryResult<()>> + Send,
{
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        (self.f)(task.clone()).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn TaskHandler>
where
    F: Fn(TaskInfo) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = InventoryResult<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        f,
        _marker: PhantomData,
    })
}
