//! 任务执行
//!
//! Worker 在启动时把任务注册表绑定为分发表，按任务名分发、套上中间件链，
//! 并把处理结果翻译为队列的完成、重试或归档。

pub mod dispatch;
pub mod fan_out;
pub mod handler;
pub mod middleware;
pub mod worker;

pub use dispatch::DispatchHandler;
pub use fan_out::{enqueue_all, fan_out, FanOutReport};
pub use handler::handler_fn;
pub use middleware::{chain, default_middlewares, LoggingMiddleware, Middleware, MetricsMiddleware};
pub use worker::Worker;
