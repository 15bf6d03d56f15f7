#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use inventory_collectors::{register_all, RegistrationContext, AWS_SOURCE, GARDENER_SOURCE};
use inventory_core::{
    config::{AppConfig, AwsAccountConfig, RetryConfig},
    models::{Task, TaskInfo},
    traits::{TaskHandler, TaskQueue},
    ManualClock,
};
use inventory_infrastructure::{
    observability::{LatestValueCollector, MetricSample},
    InMemoryResourceStore, InMemoryTaskQueue, StaticResourceSource,
};

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub queue: Arc<InMemoryTaskQueue>,
    pub store: Arc<InMemoryResourceStore>,
    pub source: Arc<StaticResourceSource>,
    pub metrics: Arc<LatestValueCollector>,
    pub ctx: RegistrationContext,
}

pub fn account(id: &str) -> AwsAccountConfig {
    AwsAccountConfig {
        account_id: id.to_string(),
        name: String::new(),
        credentials: None,
    }
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.gardener.enabled = true;
    config.aws.enabled = true;
    config.aws.accounts = vec![account("111"), account("222")];
    config
}

pub fn harness_with(config: AppConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let queue = Arc::new(InMemoryTaskQueue::with_clock(
        RetryConfig::default(),
        clock.clone(),
    ));
    let store = Arc::new(InMemoryResourceStore::with_clock(clock.clone()));
    let source = Arc::new(StaticResourceSource::new());
    let metrics = Arc::new(LatestValueCollector::new());
    let ctx = RegistrationContext::new(
        Arc::new(config),
        queue.clone(),
        store.clone(),
        metrics.clone(),
    )
    .with_source(GARDENER_SOURCE, source.clone())
    .with_source(AWS_SOURCE, source.clone());

    Harness {
        clock,
        queue,
        store,
        source,
        metrics,
        ctx,
    }
}

/// 两个数据源都启用并完成注册
pub fn harness() -> Harness {
    let harness = harness_with(config());
    register_all(&harness.ctx).unwrap();
    harness
}

impl Harness {
    pub fn handler(&self, name: &str) -> Arc<dyn TaskHandler> {
        self.ctx.tasks.get(name).unwrap()
    }

    /// 子任务按名称过滤后的负载
    pub async fn enqueued_payloads(&self, name: &str) -> Vec<String> {
        let mut payloads: Vec<String> = self
            .queue
            .list(None, None)
            .await
            .unwrap()
            .into_iter()
            .filter(|t| t.name == name)
            .map(|t| t.payload_lossy())
            .collect();
        payloads.sort();
        payloads
    }

    pub fn samples(&self, metric: &str) -> Vec<MetricSample> {
        self.metrics
            .collect()
            .into_iter()
            .filter(|s| s.metric == metric)
            .collect()
    }
}

/// 构造一次任务执行，使用独立的队列以免影响被测队列
pub async fn task(name: &str, payload: Option<Value>) -> TaskInfo {
    let scratch = InMemoryTaskQueue::default();
    let task = match payload {
        Some(payload) => Task::json(name, &payload).unwrap(),
        None => Task::empty(name),
    };
    scratch.enqueue(task).await.unwrap()
}
