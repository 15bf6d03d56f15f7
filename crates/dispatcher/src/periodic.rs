use std::collections::HashSet;

use inventory_core::{models::PeriodicJob, InventoryError, InventoryResult};

use crate::cron_utils::validate_schedule;

/// 合并代码注册的默认任务与运维配置的任务
///
/// 结果顺序为默认任务在前、配置任务在后。任务名重复立即报错，相同的调度表达式允许重复。
pub fn merge_periodic_jobs(
    defaults: Vec<PeriodicJob>,
    configured: Vec<PeriodicJob>,
) -> InventoryResult<Vec<PeriodicJob>> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(defaults.len() + configured.len());

    for job in defaults.into_iter().chain(configured) {
        validate_schedule(&job.spec)?;
        if !seen.insert(job.task_name.clone()) {
            return Err(InventoryError::config_error(format!(
                "周期任务重复: {}",
                job.task_name
            )));
        }
        merged.push(job);
    }

    Ok(merged)
}
