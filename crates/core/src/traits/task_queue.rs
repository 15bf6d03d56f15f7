use async_trait::async_trait;

use crate::{
    models::{Task, TaskInfo, TaskState},
    InventoryResult,
};

/// 任务队列（Broker）抽象接口
///
/// 至少一次投递：`dequeue` 租约到期而未确认的任务会被再次投递。
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// 任务入队，返回带ID的任务信息
    async fn enqueue(&self, task: Task) -> InventoryResult<TaskInfo>;

    /// 从给定队列中租用一个就绪任务并标记为 active
    async fn dequeue(&self, queues: &[String]) -> InventoryResult<Option<TaskInfo>>;

    /// 确认任务执行完成
    async fn complete(&self, id: &str) -> InventoryResult<()>;

    /// 报告任务失败；可重试时按退避策略进入 retry，否则直接归档
    async fn fail(&self, id: &str, error: &str, retryable: bool) -> InventoryResult<TaskState>;

    /// 查询任务
    async fn get(&self, id: &str) -> InventoryResult<Option<TaskInfo>>;

    /// 列出任务，可按队列和状态过滤
    async fn list(
        &self,
        queue: Option<&str>,
        state: Option<TaskState>,
    ) -> InventoryResult<Vec<TaskInfo>>;

    /// 取消尚未开始的任务（归档）
    async fn cancel(&self, id: &str) -> InventoryResult<()>;

    /// 删除任务
    async fn delete(&self, id: &str) -> InventoryResult<()>;

    /// 暂停队列，暂停期间不再投递
    async fn pause(&self, queue: &str) -> InventoryResult<()>;

    /// 恢复队列
    async fn resume(&self, queue: &str) -> InventoryResult<()>;

    /// 删除队列中所有尚未开始的任务，返回删除数量
    async fn drain(&self, queue: &str) -> InventoryResult<u64>;
}
