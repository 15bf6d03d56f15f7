use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_QUEUE;

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

/// Gardener 数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenerConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// 引用 `credentials.sessions` 中的会话名称
    pub credentials: String,
    pub queue: String,
}

impl Default for GardenerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            credentials: String::new(),
            queue: default_queue(),
        }
    }
}

impl GardenerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Gardener endpoint不能为空"));
        }
        if self.credentials.is_empty() {
            return Err(anyhow::anyhow!("Gardener必须指定凭据会话"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsAccountConfig {
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    /// 覆盖 `aws.credentials`
    #[serde(default)]
    pub credentials: Option<String>,
}

/// AWS 数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub credentials: String,
    pub queue: String,
    pub accounts: Vec<AwsAccountConfig>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            credentials: String::new(),
            queue: default_queue(),
            accounts: Vec::new(),
        }
    }
}

impl AwsConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.endpoint.is_empty() {
            return Err(anyhow::anyhow!("AWS endpoint不能为空"));
        }
        if self.accounts.is_empty() {
            return Err(anyhow::anyhow!("AWS至少需要配置一个账号"));
        }
        for account in &self.accounts {
            if account.account_id.is_empty() {
                return Err(anyhow::anyhow!("AWS账号ID不能为空"));
            }
            if self.credentials_for(&account.account_id).is_none() {
                return Err(anyhow::anyhow!(
                    "AWS账号 {} 没有可用的凭据会话",
                    account.account_id
                ));
            }
        }
        Ok(())
    }

    /// 账号使用的会话名称
    pub fn credentials_for(&self, account_id: &str) -> Option<&str> {
        let account = self.accounts.iter().find(|a| a.account_id == account_id)?;
        match account.credentials.as_deref() {
            Some(name) if !name.is_empty() => Some(name),
            _ if !self.credentials.is_empty() => Some(self.credentials.as_str()),
            _ => None,
        }
    }

    /// 所有被引用的会话名称
    pub fn referenced_sessions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .accounts
            .iter()
            .filter_map(|a| self.credentials_for(&a.account_id))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
