//! 应用配置
//!
//! 配置按 默认值 → TOML 文件 → 环境变量 的顺序叠加，环境变量前缀为 `INVENTORY_`，
//! 层级分隔符为 `__`，例如 `INVENTORY_DATABASE__URL`。

pub mod models;

pub use models::*;
