use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ensure_duration_bound;
use crate::models::{DEFAULT_MAX_RETRY, DEFAULT_QUEUE, DEFAULT_TIMEOUT};

/// 任务队列后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    /// 进程内队列，只适用于 scheduler 与 worker 同进程运行
    #[default]
    Memory,
    Postgres,
}

/// 失败重试的退避参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub base_interval_seconds: u64,
    pub max_interval_seconds: u64,
    pub backoff_multiplier: f64,
    /// 0.0 ~ 1.0，按比例加入随机抖动
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_interval_seconds: 10,
            max_interval_seconds: 3600,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_interval_seconds == 0 {
            return Err(anyhow::anyhow!("重试基础间隔必须大于0"));
        }

        if self.max_interval_seconds < self.base_interval_seconds {
            return Err(anyhow::anyhow!("最大重试间隔不能小于基础间隔"));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(anyhow::anyhow!("退避倍数不能小于1.0"));
        }

        ensure_duration_bound("max_interval_seconds", self.max_interval_seconds)?;

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(anyhow::anyhow!("抖动系数必须在0.0到1.0之间"));
        }

        Ok(())
    }

    /// 第 `retried` 次重试前的等待时间（不含抖动）
    pub fn backoff(&self, retried: u32) -> Duration {
        let exponent = i32::try_from(retried).unwrap_or(i32::MAX);
        let secs = self.base_interval_seconds as f64 * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_interval_seconds as f64);
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Task queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub default_queue: String,
    pub max_retry: u32,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            default_queue: DEFAULT_QUEUE.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
            timeout_seconds: DEFAULT_TIMEOUT.as_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_queue.is_empty() {
            return Err(anyhow::anyhow!("默认队列名称不能为空"));
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("任务超时时间必须大于0"));
        }
        ensure_duration_bound("timeout_seconds", self.timeout_seconds)?;

        self.retry.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_DURATION_SECONDS;

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig {
            base_interval_seconds: 10,
            max_interval_seconds: 60,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        };
        assert_eq!(retry.backoff(0), Duration::from_secs(10));
        assert_eq!(retry.backoff(2), Duration::from_secs(40));
        assert_eq!(retry.backoff(10), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_jitter_rejected() {
        let retry = RetryConfig {
            jitter_factor: 1.5,
            ..RetryConfig::default()
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_durations_beyond_bound_rejected() {
        let config = QueueConfig {
            timeout_seconds: u64::MAX,
            ..QueueConfig::default()
        };
        assert!(config.validate().is_err());

        let retry = RetryConfig {
            max_interval_seconds: MAX_DURATION_SECONDS + 1,
            ..RetryConfig::default()
        };
        assert!(retry.validate().is_err());
    }
}
