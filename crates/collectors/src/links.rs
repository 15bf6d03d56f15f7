//! 关系表填充
//!
//! 每个 [`LinkSpec`] 独立执行一次 owner/owned 连接并 upsert 关系行。
//! 某个关系失败不影响其他关系，全部执行后返回第一个错误。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use inventory_core::{
    models::{LinkSpec, PeriodicJob, TaskInfo, UpsertStats},
    traits::{ResourceStore, TaskHandler},
    InventoryResult,
};
use inventory_domain::{
    links::{AWS_LINKS, GARDENER_LINKS},
    task_names::{AWS_LINK_ALL, G_LINK_ALL},
};
use inventory_infrastructure::observability::{
    latest_value::sample_key, LatestValueCollector, MetricDescriptor, MetricSample,
    StructuredLogger,
};

use crate::context::RegistrationContext;

pub const LINKS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_links",
    help: "Link rows written by the last link pass",
    labels: &["link"],
};

pub struct LinkPass {
    pub task: &'static str,
    pub links: &'static [LinkSpec],
    pub store: Arc<dyn ResourceStore>,
    pub metrics: Arc<LatestValueCollector>,
}

impl LinkPass {
    pub async fn run(&self) -> InventoryResult<UpsertStats> {
        let mut total = UpsertStats::default();
        let mut first_error = None;

        for spec in self.links {
            match self.store.link(spec).await {
                Ok(stats) => {
                    StructuredLogger::log_link_pass_completed(
                        spec.name,
                        stats.inserted,
                        stats.updated,
                    );
                    self.metrics.add_metric(
                        sample_key(self.task, spec.name),
                        MetricSample::new(
                            LINKS_METRIC.name,
                            vec![spec.name.to_string()],
                            stats.affected() as f64,
                        ),
                    );
                    total = total.merge(stats);
                }
                Err(e) => {
                    warn!(task.name = self.task, link = spec.name, error = %e, "关系填充失败");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

#[async_trait]
impl TaskHandler for LinkPass {
    async fn handle(&self, _task: &TaskInfo) -> InventoryResult<()> {
        self.run().await.map(|_| ())
    }
}

fn link_pass(ctx: &RegistrationContext, task: &'static str, links: &'static [LinkSpec]) -> LinkPass {
    LinkPass {
        task,
        links,
        store: ctx.store.clone(),
        metrics: ctx.metrics.clone(),
    }
}

pub fn register(ctx: &RegistrationContext) -> InventoryResult<()> {
    let passes = [
        (ctx.config.gardener.enabled, G_LINK_ALL, GARDENER_LINKS, &ctx.config.gardener.queue),
        (ctx.config.aws.enabled, AWS_LINK_ALL, AWS_LINKS, &ctx.config.aws.queue),
    ];
    if passes.iter().any(|(enabled, ..)| *enabled) {
        ctx.describe(LINKS_METRIC)?;
    }

    for (enabled, task, links, queue) in passes {
        if !enabled {
            continue;
        }
        ctx.register_task(task, Arc::new(link_pass(ctx, task, links)))?;
        if ctx.config.scheduler.default_jobs {
            ctx.register_job(
                PeriodicJob::new("@every 30m", task)
                    .with_queue(queue.as_str())
                    .with_description("Populate link tables"),
            )?;
        }
        info!(task.name = task, links = links.len(), "关系填充任务已注册");
    }
    Ok(())
}
