use tracing::info;

use inventory_core::InventoryResult;

use crate::context::RegistrationContext;
use crate::{aws, gardener, links};

/// 按固定顺序调用各功能模块的 `register`
///
/// 任务名或周期任务重复会在这里返回错误，调用方应当中止启动。
pub fn register_all(ctx: &RegistrationContext) -> InventoryResult<()> {
    gardener::register(ctx)?;
    aws::register(ctx)?;
    links::register(ctx)?;

    let mut names = ctx.tasks.keys();
    names.sort();
    info!(tasks = ?names, periodic_jobs = ctx.periodic.len(), "任务处理器注册完成");
    Ok(())
}
