//! 资产清单系统的核心类型
//!
//! 包含错误类型、注册表、任务与资源模型、配置以及各组件之间的 trait 边界。

pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod registry;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{InventoryError, InventoryResult};
pub use registry::{Registry, RegistryError};
