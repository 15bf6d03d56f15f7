use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{InventoryError, InventoryResult};

pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_MAX_RETRY: u32 = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// 任何以秒配置的时长的上限（十年），保证换算为 `chrono::Duration` 并加到当前时间时不会溢出
pub const MAX_DURATION_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// 任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Active,
    Scheduled,
    Retry,
    Archived,
    Completed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Active => "active",
            TaskState::Scheduled => "scheduled",
            TaskState::Retry => "retry",
            TaskState::Archived => "archived",
            TaskState::Completed => "completed",
        }
    }

    /// 尚未开始执行、可以被取消或清空的状态
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            TaskState::Pending | TaskState::Scheduled | TaskState::Retry
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Archived | TaskState::Completed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskState::Pending),
            "active" => Ok(TaskState::Active),
            "scheduled" => Ok(TaskState::Scheduled),
            "retry" => Ok(TaskState::Retry),
            "archived" => Ok(TaskState::Archived),
            "completed" => Ok(TaskState::Completed),
            other => Err(InventoryError::UnsupportedValue(format!(
                "无效的任务状态: {other}"
            ))),
        }
    }
}

/// 入队选项
#[derive(Debug, Clone)]
pub struct TaskOptions {
    pub queue: String,
    pub timeout: Duration,
    pub max_retry: u32,
    pub process_at: Option<DateTime<Utc>>,
    pub task_id: Option<String>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retry: DEFAULT_MAX_RETRY,
            process_at: None,
            task_id: None,
        }
    }
}

/// 待入队的任务：名称 + 不透明的负载字节
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub payload: Vec<u8>,
    pub options: TaskOptions,
}

impl Task {
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
            options: TaskOptions::default(),
        }
    }

    /// 无负载任务，通常是扇出型元任务
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn json<T: Serialize>(name: impl Into<String>, payload: &T) -> InventoryResult<Self> {
        Ok(Self::new(name, serde_json::to_vec(payload)?))
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.options.queue = queue.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.options.max_retry = max_retry;
        self
    }

    pub fn with_process_at(mut self, at: DateTime<Utc>) -> Self {
        self.options.process_at = Some(at);
        self
    }

    pub fn with_task_id(mut self, id: impl Into<String>) -> Self {
        self.options.task_id = Some(id.into());
        self
    }
}

/// Broker中任务的完整视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: String,
    pub name: String,
    pub payload: Vec<u8>,
    pub queue: String,
    pub state: TaskState,
    pub max_retry: u32,
    pub retried: u32,
    pub timeout_seconds: u64,
    pub last_error: Option<String>,
    pub process_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskInfo {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// 解析JSON负载；解析失败属于永久错误，重试无意义
    pub fn decode_payload<T: serde::de::DeserializeOwned>(&self) -> InventoryResult<T> {
        serde_json::from_slice(&self.payload).map_err(|e| {
            InventoryError::invalid_payload(format!("任务 {} 负载解析失败: {e}", self.name))
                .skip_retry()
        })
    }

    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
