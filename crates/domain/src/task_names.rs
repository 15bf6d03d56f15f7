//! 任务名称常量，调度配置与 CLI 使用相同的字符串

pub const G_COLLECT_PROJECTS: &str = "g:collect-projects";
pub const G_COLLECT_SEEDS: &str = "g:collect-seeds";
pub const G_COLLECT_SHOOTS: &str = "g:collect-shoots";
pub const G_COLLECT_CLOUD_PROFILE_IMAGES: &str = "g:collect-cloud-profile-images";
pub const G_COLLECT_ALL: &str = "g:collect-all";
pub const G_LINK_ALL: &str = "g:link-all";

pub const AWS_COLLECT_REGIONS: &str = "aws:collect-regions";
pub const AWS_COLLECT_VPCS: &str = "aws:collect-vpcs";
pub const AWS_COLLECT_INSTANCES: &str = "aws:collect-instances";
pub const AWS_COLLECT_ALL: &str = "aws:collect-all";
pub const AWS_LINK_ALL: &str = "aws:link-all";
