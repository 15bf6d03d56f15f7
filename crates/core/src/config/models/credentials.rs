use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ensure_duration_bound;
use crate::models::MAX_DURATION_SECONDS;

/// 会话来源类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// 从文件读取的 JWT 或客户端证书，不可续期
    File,
    /// 用身份令牌向 secret store 换取客户端令牌，可续期
    TokenExchange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    pub kind: SessionKind,
    #[serde(default)]
    pub token_path: Option<String>,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_mount")]
    pub mount: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub identity_token_path: Option<String>,
    /// 是否启动后台刷新
    #[serde(default)]
    pub background_refresh: bool,
}

fn default_mount() -> String {
    "jwt".to_string()
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            return Err(anyhow::anyhow!("会话名称不能为空"));
        }

        match self.kind {
            SessionKind::File => {
                let has_token = self.token_path.is_some();
                let has_cert = self.cert_path.is_some() && self.key_path.is_some();
                if has_token == has_cert {
                    return Err(anyhow::anyhow!(
                        "会话 {} 必须配置 token_path 或 cert_path + key_path 之一",
                        self.name
                    ));
                }
            }
            SessionKind::TokenExchange => {
                if self.address.as_deref().unwrap_or_default().is_empty() {
                    return Err(anyhow::anyhow!("会话 {} 缺少 address", self.name));
                }
                if self.role.as_deref().unwrap_or_default().is_empty() {
                    return Err(anyhow::anyhow!("会话 {} 缺少 role", self.name));
                }
                if self.identity_token_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "会话 {} 缺少 identity_token_path",
                        self.name
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// 距离过期不足该时长的会话视为不可用
    pub safety_margin_seconds: u64,
    /// 后台刷新在 TTL 的该比例处触发
    pub refresh_fraction: f64,
    pub retry_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub sessions: Vec<SessionConfig>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            safety_margin_seconds: 60,
            refresh_fraction: 0.8,
            retry_interval_seconds: 30,
            request_timeout_seconds: 30,
            sessions: Vec::new(),
        }
    }
}

impl CredentialsConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.refresh_fraction > 0.0 && self.refresh_fraction < 1.0) {
            return Err(anyhow::anyhow!("刷新比例必须在0.0到1.0之间（不含端点）"));
        }

        if self.retry_interval_seconds == 0 {
            return Err(anyhow::anyhow!("刷新重试间隔必须大于0"));
        }

        ensure_duration_bound("safety_margin_seconds", self.safety_margin_seconds)?;
        ensure_duration_bound("retry_interval_seconds", self.retry_interval_seconds)?;
        ensure_duration_bound("request_timeout_seconds", self.request_timeout_seconds)?;

        let mut names = std::collections::HashSet::new();
        for session in &self.sessions {
            session.validate()?;
            if !names.insert(session.name.as_str()) {
                return Err(anyhow::anyhow!("会话名称重复: {}", session.name));
            }
        }

        Ok(())
    }

    pub fn session(&self, name: &str) -> Option<&SessionConfig> {
        self.sessions.iter().find(|s| s.name == name)
    }

    pub fn safety_margin(&self) -> chrono::Duration {
        // validate() 已限制上限；未校验的配置按上限截断
        chrono::Duration::seconds(self.safety_margin_seconds.min(MAX_DURATION_SECONDS) as i64)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_safety_margin_rejected_and_clamped() {
        let config = CredentialsConfig {
            safety_margin_seconds: u64::MAX,
            ..CredentialsConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(
            config.safety_margin(),
            chrono::Duration::seconds(MAX_DURATION_SECONDS as i64)
        );
    }

    #[test]
    fn test_default_credentials_config_is_valid() {
        assert!(CredentialsConfig::default().validate().is_ok());
    }
}
