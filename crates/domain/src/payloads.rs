//! 扇出子任务携带的最小负载

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub project: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProfilePayload {
    pub cloud_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayload {
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPayload {
    pub account_id: String,
    pub region: String,
}

impl RegionPayload {
    /// 指标分区标签
    pub fn partition(&self) -> String {
        format!("{}/{}", self.account_id, self.region)
    }
}
