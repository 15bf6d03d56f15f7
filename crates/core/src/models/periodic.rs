use serde::{Deserialize, Serialize};

use super::task::DEFAULT_QUEUE;
use crate::registry::Registry;

/// 周期任务定义：调度表达式 + 任务模板
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodicJob {
    pub spec: String,
    #[serde(rename = "name")]
    pub task_name: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default)]
    pub description: String,
}

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

impl PeriodicJob {
    pub fn new(spec: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            task_name: task_name.into(),
            payload: None,
            queue: default_queue(),
            description: String::new(),
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// 每次触发生成的负载字节，未配置负载时为空
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => value.to_string().into_bytes(),
        }
    }
}

/// 代码注册的默认周期任务，以任务名为键
pub type PeriodicJobRegistry = Registry<String, PeriodicJob>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_bytes() {
        let job = PeriodicJob::new("@every 1h", "g:collect-seeds");
        assert!(job.payload_bytes().is_empty());

        let job = job.with_payload(json!({"project": "dev"}));
        assert_eq!(job.payload_bytes(), br#"{"project":"dev"}"#.to_vec());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let job: PeriodicJob =
            serde_json::from_value(json!({"spec": "@hourly", "name": "aws:collect-all"})).unwrap();
        assert_eq!(job.queue, DEFAULT_QUEUE);
        assert_eq!(job.task_name, "aws:collect-all");
        assert!(job.description.is_empty());
    }
}
