use thiserror::Error;

use crate::registry::RegistryError;

/// 清单系统错误类型定义
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("任务未找到: {id}")]
    TaskNotFound { id: String },

    #[error("未知的任务名称: {0}")]
    UnknownTask(String),

    #[error("无效的调度表达式: {expr} - {message}")]
    InvalidSchedule { expr: String, message: String },

    #[error("注册表错误: {0}")]
    Registry(#[from] RegistryError),

    #[error("任务队列错误: {0}")]
    Queue(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("无效的任务负载: {0}")]
    InvalidPayload(String),

    #[error("不支持的配置值: {0}")]
    UnsupportedValue(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("操作超时: {0}")]
    Timeout(String),

    #[error("凭据错误: {0}")]
    Credential(String),

    #[error("会话不可用: {name}")]
    SessionUnavailable { name: String },

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("不再重试: {0}")]
    SkipRetry(Box<InventoryError>),
}

/// 统一的Result类型
pub type InventoryResult<T> = std::result::Result<T, InventoryError>;

impl InventoryError {
    pub fn invalid_payload<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPayload(msg.into())
    }

    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn queue_error<S: Into<String>>(msg: S) -> Self {
        Self::Queue(msg.into())
    }

    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    pub fn session_unavailable<S: Into<String>>(name: S) -> Self {
        Self::SessionUnavailable { name: name.into() }
    }

    /// 包装为"不再重试"错误，Broker收到后直接归档任务，不消耗重试次数
    pub fn skip_retry(self) -> Self {
        match self {
            Self::SkipRetry(_) => self,
            other => Self::SkipRetry(Box::new(other)),
        }
    }

    pub fn is_skip_retry(&self) -> bool {
        matches!(self, Self::SkipRetry(_))
    }

    /// 永久性错误：重试永远不会成功
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::SkipRetry(_)
                | Self::InvalidPayload(_)
                | Self::UnknownTask(_)
                | Self::UnsupportedValue(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        !self.is_permanent()
    }

    /// 配置类错误，启动阶段出现即终止进程
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Registry(_) | Self::InvalidSchedule { .. }
        )
    }

    /// 用于指标标签和日志的错误分类
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) | Self::DatabaseOperation(_) => "database",
            Self::TaskNotFound { .. } => "task_not_found",
            Self::UnknownTask(_) => "unknown_task",
            Self::InvalidSchedule { .. } => "invalid_schedule",
            Self::Registry(_) => "registry",
            Self::Queue(_) => "queue",
            Self::Serialization(_) => "serialization",
            Self::Configuration(_) => "configuration",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::UnsupportedValue(_) => "unsupported_value",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::Credential(_) | Self::SessionUnavailable { .. } => "credential",
            Self::Internal(_) => "internal",
            Self::SkipRetry(inner) => inner.kind(),
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for InventoryError {
    fn from(err: anyhow::Error) -> Self {
        InventoryError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for InventoryError {
    fn from(err: config::ConfigError) -> Self {
        InventoryError::Configuration(err.to_string())
    }
}
