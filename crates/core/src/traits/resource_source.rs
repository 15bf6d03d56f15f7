use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::InventoryResult;

/// 采集范围，例如 `gardener` 或 `aws/123456789012`，并可附带区域等限定
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub provider: String,
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

impl Scope {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            params: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.provider)?;
        for (k, v) in &self.params {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

/// 一页原始记录；`next_page_token` 为空表示没有更多页
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// 云厂商或集群管理面的分页列举接口
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch_page(
        &self,
        kind: &str,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> InventoryResult<Page>;
}
