//! 各数据源的采集任务与关系填充任务
//!
//! 每个功能模块提供 `register(&RegistrationContext)`，向任务注册表登记处理器，
//! 向指标采集器登记描述，并按需登记默认的周期任务。

pub mod aws;
pub mod collect;
pub mod context;
pub mod gardener;
pub mod links;
pub mod raw;
pub mod registration;

pub use collect::{collect, dedup_records, fetch_all, CollectReport, Collection};
pub use context::{ProviderContext, RegistrationContext, AWS_SOURCE, GARDENER_SOURCE};
pub use registration::register_all;
