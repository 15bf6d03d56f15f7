use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ensure_duration_bound;
use crate::models::{PeriodicJob, DEFAULT_QUEUE};

/// 周期调度配置
///
/// `jobs` 与代码注册的默认周期任务合并；同一任务名不能出现两次。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 是否启用代码内置的默认周期任务
    pub default_jobs: bool,
    pub jobs: Vec<PeriodicJob>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_jobs: true,
            jobs: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for job in &self.jobs {
            if job.spec.trim().is_empty() {
                return Err(anyhow::anyhow!("周期任务 {} 的调度表达式不能为空", job.task_name));
            }
            if job.task_name.is_empty() {
                return Err(anyhow::anyhow!("周期任务名称不能为空"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub enabled: bool,
    /// 并发执行槽位，0 表示使用可用的CPU数量
    pub concurrency: usize,
    pub queues: Vec<String>,
    pub poll_interval_ms: u64,
    /// 关闭时等待在途任务的宽限期
    pub shutdown_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: 0,
            queues: vec![DEFAULT_QUEUE.to_string()],
            poll_interval_ms: 1000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.queues.is_empty() {
            return Err(anyhow::anyhow!("Worker监听的队列不能为空"));
        }

        if self.queues.iter().any(|q| q.is_empty()) {
            return Err(anyhow::anyhow!("队列名称不能为空"));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("轮询间隔必须大于0"));
        }

        ensure_duration_bound("shutdown_timeout_seconds", self.shutdown_timeout_seconds)?;

        Ok(())
    }

    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency > 0 {
            return self.concurrency;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}
