pub mod app_config;
pub mod credentials;
pub mod database;
pub mod observability;
pub mod providers;
pub mod queue;
pub mod scheduler_worker;

pub use app_config::{AppConfig, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use credentials::{CredentialsConfig, SessionConfig, SessionKind};
pub use database::DatabaseConfig;
pub use observability::{LogFormat, LoggingConfig, MetricsConfig};
pub use providers::{AwsAccountConfig, AwsConfig, GardenerConfig};
pub use queue::{QueueBackend, QueueConfig, RetryConfig};
pub use scheduler_worker::{SchedulerConfig, WorkerConfig};

use crate::models::MAX_DURATION_SECONDS;

/// 时长配置不能超过 [`MAX_DURATION_SECONDS`]
pub(crate) fn ensure_duration_bound(field: &str, seconds: u64) -> anyhow::Result<()> {
    if seconds > MAX_DURATION_SECONDS {
        return Err(anyhow::anyhow!(
            "{field} 不能超过 {MAX_DURATION_SECONDS} 秒，当前为 {seconds}"
        ));
    }
    Ok(())
}
