//! # 数据模型
//!
//! - [`Task`] / [`TaskInfo`]：队列中的任务及其状态
//! - [`PeriodicJob`]：调度器周期性入队的任务模板
//! - [`Session`]：外部签发、带过期时间的会话凭据
//! - [`Record`] / [`UpsertBatch`]：采集结果的行模型与批量 upsert 载体

pub mod periodic;
pub mod resource;
pub mod session;
pub mod task;

pub use periodic::*;
pub use resource::*;
pub use session::*;
pub use task::*;
