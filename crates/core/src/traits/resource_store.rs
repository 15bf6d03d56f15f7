use async_trait::async_trait;

use crate::{
    models::{ColumnValue, LinkSpec, UpsertBatch, UpsertStats},
    InventoryResult,
};

/// 资源存储抽象接口
///
/// 多个进程可能同时写同一张表，正确性依赖数据库自身的冲突处理，
/// 而不是进程内的加锁。
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// 单条语句批量插入；自然键冲突时更新可变列和 updated_at
    async fn upsert(&self, batch: UpsertBatch) -> InventoryResult<UpsertStats>;

    /// 读取去重后的列组合，用于扇出时枚举父资源
    async fn select(
        &self,
        table: &'static str,
        columns: &'static [&'static str],
    ) -> InventoryResult<Vec<Vec<ColumnValue>>>;

    /// 连接两张已采集的表并 upsert 关系行；冲突时只刷新 updated_at，从不删除
    async fn link(&self, spec: &LinkSpec) -> InventoryResult<UpsertStats>;
}
