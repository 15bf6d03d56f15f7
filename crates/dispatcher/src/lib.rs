//! 周期任务调度
//!
//! 解析调度表达式、合并默认与配置的周期任务，并按时把任务实例推入队列。

pub mod cron_utils;
pub mod periodic;
pub mod scheduler;

pub use cron_utils::{validate_schedule, JobSchedule};
pub use periodic::merge_periodic_jobs;
pub use scheduler::Scheduler;
