//! 基础设施实现：任务队列、资源存储、会话凭据、数据源和可观测性

pub mod credentials;
pub mod database;
pub mod observability;
pub mod queue;
pub mod source;
pub mod store;

pub use credentials::{SessionCache, SessionRefresher};
pub use queue::{InMemoryTaskQueue, PostgresTaskQueue};
pub use source::{HttpResourceSource, StaticResourceSource};
pub use store::{InMemoryResourceStore, PostgresResourceStore};
