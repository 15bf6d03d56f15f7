use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use inventory_core::{
    models::TaskInfo,
    traits::{TaskHandler, TaskRegistry},
    InventoryError, InventoryResult,
};

/// 按任务名分发，并把超时转换为瞬时错误
///
/// 分发表在构造时从 [`TaskRegistry`] 复制，之后的注册不会影响已启动的 Worker。
pub struct DispatchHandler {
    table: HashMap<String, Arc<dyn TaskHandler>>,
}

impl DispatchHandler {
    pub fn bind(registry: &TaskRegistry) -> Self {
        Self {
            table: registry.snapshot().into_iter().collect(),
        }
    }

    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TaskHandler for DispatchHandler {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let handler = self
            .table
            .get(&task.name)
            .ok_or_else(|| InventoryError::UnknownTask(task.name.clone()))?;

        match tokio::time::timeout(task.timeout(), handler.handle(task)).await {
            Ok(result) => result,
            Err(_) => Err(InventoryError::Timeout(format!(
                "任务 {} 执行超过 {}s",
                task.name, task.timeout_seconds
            ))),
        }
    }
}
