use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{
    credentials::CredentialsConfig,
    database::DatabaseConfig,
    observability::{LoggingConfig, MetricsConfig},
    providers::{AwsConfig, GardenerConfig},
    queue::QueueConfig,
    scheduler_worker::{SchedulerConfig, WorkerConfig},
};

pub const DEFAULT_CONFIG_PATH: &str = "config/inventory.toml";
pub const ENV_PREFIX: &str = "INVENTORY";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
    pub gardener: GardenerConfig,
    pub aws: AwsConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format); an explicit path must exist, the default path is optional
    /// 3. Environment variable overrides (prefix: INVENTORY_, separator: __)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("配置文件不存在: {}", path));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_PATH).exists() {
                    builder = builder.add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = ConfigBuilder::builder()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()
            .context("解析TOML配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置验证失败")?;
        self.queue.validate().context("任务队列配置验证失败")?;
        self.scheduler.validate().context("调度器配置验证失败")?;
        self.worker.validate().context("Worker配置验证失败")?;
        self.metrics.validate().context("指标配置验证失败")?;
        self.logging.validate().context("日志配置验证失败")?;
        self.credentials.validate().context("凭据配置验证失败")?;
        self.gardener.validate().context("Gardener配置验证失败")?;
        self.aws.validate().context("AWS配置验证失败")?;

        // 数据源引用的会话必须存在
        if self.gardener.enabled && self.credentials.session(&self.gardener.credentials).is_none() {
            return Err(anyhow::anyhow!(
                "Gardener引用了未配置的会话: {}",
                self.gardener.credentials
            ));
        }
        if self.aws.enabled {
            for name in self.aws.referenced_sessions() {
                if self.credentials.session(name).is_none() {
                    return Err(anyhow::anyhow!("AWS引用了未配置的会话: {}", name));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, QueueBackend, SessionKind};

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue.backend, QueueBackend::Memory);
        assert!(config.scheduler.default_jobs);
    }

    #[test]
    fn test_from_toml_with_sessions_and_jobs() {
        let config = AppConfig::from_toml(
            r#"
            [queue]
            backend = "postgres"

            [logging]
            format = "json"

            [[scheduler.jobs]]
            spec = "@every 15m"
            name = "g:collect-seeds"
            queue = "gardener"

            [[credentials.sessions]]
            name = "garden"
            kind = "file"
            token_path = "/var/run/secrets/garden/token"

            [gardener]
            enabled = true
            endpoint = "https://gardener.example.com"
            credentials = "garden"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.backend, QueueBackend::Postgres);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.scheduler.jobs.len(), 1);
        assert_eq!(config.scheduler.jobs[0].queue, "gardener");
        assert_eq!(
            config.credentials.session("garden").map(|s| s.kind),
            Some(SessionKind::File)
        );
    }

    #[test]
    fn test_missing_session_reference_rejected() {
        let err = AppConfig::from_toml(
            r#"
            [gardener]
            enabled = true
            endpoint = "https://gardener.example.com"
            credentials = "missing"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_aws_account_falls_back_to_provider_credentials() {
        let config = AppConfig::from_toml(
            r#"
            [[credentials.sessions]]
            name = "aws-default"
            kind = "file"
            token_path = "/tmp/token"

            [[credentials.sessions]]
            name = "aws-prod"
            kind = "file"
            token_path = "/tmp/prod-token"

            [aws]
            enabled = true
            endpoint = "https://aws-proxy.example.com"
            credentials = "aws-default"

            [[aws.accounts]]
            account_id = "111111111111"

            [[aws.accounts]]
            account_id = "222222222222"
            credentials = "aws-prod"
            "#,
        )
        .unwrap();

        assert_eq!(config.aws.credentials_for("111111111111"), Some("aws-default"));
        assert_eq!(config.aws.credentials_for("222222222222"), Some("aws-prod"));
        assert_eq!(config.aws.credentials_for("333333333333"), None);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/inventory.toml")).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.toml");
        std::fs::write(&path, "[worker]\nconcurrency = 4\nqueues = [\"default\", \"aws\"]\n").unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.worker.effective_concurrency(), 4);
        assert_eq!(config.worker.queues, vec!["default", "aws"]);
    }
}
