use std::sync::Arc;

use inventory_core::{
    config::AppConfig,
    models::{PeriodicJob, PeriodicJobRegistry, TaskOptions},
    traits::{ResourceSource, ResourceStore, TaskHandler, TaskQueue, TaskRegistry},
    InventoryError, InventoryResult, Registry,
};
use inventory_infrastructure::observability::{LatestValueCollector, MetricDescriptor};

pub const GARDENER_SOURCE: &str = "gardener";
pub const AWS_SOURCE: &str = "aws";

/// 组合根传给各功能模块 `register` 的依赖集合
pub struct RegistrationContext {
    pub config: Arc<AppConfig>,
    pub tasks: Arc<TaskRegistry>,
    pub periodic: PeriodicJobRegistry,
    pub metrics: Arc<LatestValueCollector>,
    pub queue: Arc<dyn TaskQueue>,
    pub store: Arc<dyn ResourceStore>,
    /// 数据源名称（`gardener`、`aws`）-> 数据源
    pub sources: Registry<String, Arc<dyn ResourceSource>>,
}

impl RegistrationContext {
    pub fn new(
        config: Arc<AppConfig>,
        queue: Arc<dyn TaskQueue>,
        store: Arc<dyn ResourceStore>,
        metrics: Arc<LatestValueCollector>,
    ) -> Self {
        Self {
            config,
            tasks: Arc::new(TaskRegistry::new()),
            periodic: PeriodicJobRegistry::new(),
            metrics,
            queue,
            store,
            sources: Registry::new(),
        }
    }

    pub fn with_source(self, name: &str, source: Arc<dyn ResourceSource>) -> Self {
        self.sources.overwrite(name.to_string(), source);
        self
    }

    pub fn source(&self, name: &str) -> InventoryResult<Arc<dyn ResourceSource>> {
        self.sources
            .get(name)
            .ok_or_else(|| InventoryError::config_error(format!("数据源 {name} 未配置")))
    }

    /// 任务名重复是启动期的致命错误
    pub fn register_task(
        &self,
        name: &str,
        handler: Arc<dyn TaskHandler>,
    ) -> InventoryResult<()> {
        self.tasks.register(name.to_string(), handler)?;
        Ok(())
    }

    pub fn register_job(&self, job: PeriodicJob) -> InventoryResult<()> {
        self.periodic.register(job.task_name.clone(), job)?;
        Ok(())
    }

    pub fn describe(&self, descriptor: MetricDescriptor) -> InventoryResult<()> {
        self.metrics.describe(descriptor)?;
        Ok(())
    }

    /// 代码注册的默认周期任务，按任务名排序
    pub fn default_jobs(&self) -> Vec<PeriodicJob> {
        let mut jobs: Vec<PeriodicJob> =
            self.periodic.snapshot().into_iter().map(|(_, job)| job).collect();
        jobs.sort_by(|a, b| a.task_name.cmp(&b.task_name));
        jobs
    }

    pub fn task_options(&self, queue: &str) -> TaskOptions {
        TaskOptions {
            queue: queue.to_string(),
            timeout: self.config.queue.timeout(),
            max_retry: self.config.queue.max_retry,
            ..TaskOptions::default()
        }
    }

    pub fn provider(&self, source: &str, queue: &str) -> InventoryResult<Arc<ProviderContext>> {
        Ok(Arc::new(ProviderContext {
            queue: self.queue.clone(),
            store: self.store.clone(),
            source: self.source(source)?,
            metrics: self.metrics.clone(),
            task_options: self.task_options(queue),
        }))
    }
}

/// 单个数据源的处理器共享的依赖
pub struct ProviderContext {
    pub queue: Arc<dyn TaskQueue>,
    pub store: Arc<dyn ResourceStore>,
    pub source: Arc<dyn ResourceSource>,
    pub metrics: Arc<LatestValueCollector>,
    pub task_options: TaskOptions,
}
