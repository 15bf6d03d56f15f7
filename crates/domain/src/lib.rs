//! 采集的资源类型
//!
//! 每个资源行类型实现 [`Record`](inventory_core::models::Record)，声明自己的表名、
//! 自然键列和全部列；关系表通过 [`LinkSpec`](inventory_core::models::LinkSpec) 常量描述。

pub mod aws;
pub mod gardener;
pub mod links;
pub mod payloads;
pub mod task_names;

pub use aws::{AwsInstance, AwsRegion, AwsVpc};
pub use gardener::{CloudProfileImage, Project, Seed, Shoot};
pub use payloads::{AccountPayload, CloudProfilePayload, ProjectPayload, RegionPayload};
