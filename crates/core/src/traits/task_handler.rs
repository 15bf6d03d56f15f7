//! 任务处理器接口定义
//!
//! 每个功能模块在初始化阶段把自己的处理器注册到 [`TaskRegistry`]，
//! Worker 启动时按任务名绑定分发表。处理器通过返回值区分两类失败：
//! - 永久失败：用 [`InventoryError::skip_retry`](crate::InventoryError::skip_retry) 包装，任务直接归档
//! - 瞬时失败：原样返回，由 Broker 按退避策略重试

use std::sync::Arc;

use async_trait::async_trait;

use crate::{models::TaskInfo, registry::Registry, InventoryResult};

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()>;
}

/// 任务名 -> 处理器
pub type TaskRegistry = Registry<String, Arc<dyn TaskHandler>>;
