//! Gardener 采集任务
//!
//! 项目和 Seed 直接全量列举；Shoot 按项目扇出，机器镜像按 Shoot 引用的云配置扇出。

pub mod mapping;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use inventory_core::{
    models::{PeriodicJob, Record, TaskInfo},
    traits::{Scope, TaskHandler},
    InventoryError, InventoryResult,
};
use inventory_domain::{
    task_names::{
        G_COLLECT_ALL, G_COLLECT_CLOUD_PROFILE_IMAGES, G_COLLECT_PROJECTS, G_COLLECT_SEEDS,
        G_COLLECT_SHOOTS,
    },
    CloudProfileImage, CloudProfilePayload, Project, ProjectPayload, Seed, Shoot,
};
use inventory_infrastructure::observability::MetricDescriptor;
use inventory_worker::{enqueue_all, fan_out};

use crate::collect::{collect, Collection};
use crate::context::{ProviderContext, RegistrationContext, GARDENER_SOURCE};

const SCOPE: &str = "gardener";
const ALL_PARTITION: &str = "all";

pub const PROJECTS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_g_projects",
    help: "Gardener projects written by the last collection",
    labels: &[],
};
pub const SEEDS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_g_seeds",
    help: "Gardener seeds written by the last collection",
    labels: &[],
};
pub const SHOOTS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_g_shoots",
    help: "Gardener shoots written by the last collection, per project",
    labels: &["project"],
};
pub const IMAGES_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_g_cloud_profile_images",
    help: "Machine images written by the last collection, per cloud profile",
    labels: &["cloud_profile"],
};

fn non_empty(value: &str, field: &str, task: &TaskInfo) -> InventoryResult<()> {
    if value.trim().is_empty() {
        return Err(InventoryError::invalid_payload(format!(
            "任务 {} 的负载字段 {field} 为空",
            task.name
        ))
        .skip_retry());
    }
    Ok(())
}

/// 读取已持久化的单列去重值
async fn distinct_text(
    ctx: &ProviderContext,
    table: &'static str,
    column: &'static [&'static str],
) -> InventoryResult<Vec<String>> {
    let rows = ctx.store.select(table, column).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.first().and_then(|v| v.as_text()).map(str::to_string))
        .filter(|v| !v.is_empty())
        .collect())
}

pub struct CollectProjects(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectProjects {
    async fn handle(&self, _task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;
        collect::<Project>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: G_COLLECT_PROJECTS,
                kind: "projects",
                scope: Scope::new(SCOPE),
                partition: ALL_PARTITION.to_string(),
                metric: PROJECTS_METRIC.name,
                labels: vec![],
            },
            &mapping::project,
        )
        .await?;
        Ok(())
    }
}

pub struct CollectSeeds(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectSeeds {
    async fn handle(&self, _task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;
        collect::<Seed>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: G_COLLECT_SEEDS,
                kind: "seeds",
                scope: Scope::new(SCOPE),
                partition: ALL_PARTITION.to_string(),
                metric: SEEDS_METRIC.name,
                labels: vec![],
            },
            &mapping::seed,
        )
        .await?;
        Ok(())
    }
}

/// 无负载时按已采集的项目扇出，带 `{"project": …}` 时采集该项目的 Shoot
pub struct CollectShoots(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectShoots {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;

        if !task.has_payload() {
            let projects = distinct_text(ctx, Project::TABLE, &["name"]).await?;
            let payloads = projects
                .into_iter()
                .map(|project| ProjectPayload { project });
            fan_out(
                ctx.queue.as_ref(),
                G_COLLECT_SHOOTS,
                G_COLLECT_SHOOTS,
                payloads,
                &ctx.task_options,
            )
            .await;
            return Ok(());
        }

        let payload: ProjectPayload = task.decode_payload()?;
        non_empty(&payload.project, "project", task)?;
        let project = payload.project;

        collect::<Shoot>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: G_COLLECT_SHOOTS,
                kind: "shoots",
                scope: Scope::new(SCOPE).with("project", project.as_str()),
                partition: project.clone(),
                metric: SHOOTS_METRIC.name,
                labels: vec![project.clone()],
            },
            &move |item: &Value| mapping::shoot(&project, item),
        )
        .await?;
        Ok(())
    }
}

/// 无负载时按 Shoot 引用的云配置扇出，带 `{"cloud_profile": …}` 时采集该云配置的机器镜像
pub struct CollectCloudProfileImages(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectCloudProfileImages {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;

        if !task.has_payload() {
            let profiles = distinct_text(ctx, Shoot::TABLE, &["cloud_profile"]).await?;
            let payloads = profiles
                .into_iter()
                .map(|cloud_profile| CloudProfilePayload { cloud_profile });
            fan_out(
                ctx.queue.as_ref(),
                G_COLLECT_CLOUD_PROFILE_IMAGES,
                G_COLLECT_CLOUD_PROFILE_IMAGES,
                payloads,
                &ctx.task_options,
            )
            .await;
            return Ok(());
        }

        let payload: CloudProfilePayload = task.decode_payload()?;
        non_empty(&payload.cloud_profile, "cloud_profile", task)?;
        let profile = payload.cloud_profile;

        collect::<CloudProfileImage>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: G_COLLECT_CLOUD_PROFILE_IMAGES,
                kind: "cloudprofiles",
                scope: Scope::new(SCOPE).with("name", profile.as_str()),
                partition: profile.clone(),
                metric: IMAGES_METRIC.name,
                labels: vec![profile.clone()],
            },
            &move |item: &Value| mapping::cloud_profile_images(&profile, item),
        )
        .await?;
        Ok(())
    }
}

/// 入队全部 Gardener 采集任务（扇出任务以元任务形式入队）
pub struct CollectAll(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectAll {
    async fn handle(&self, _task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;
        enqueue_all(
            ctx.queue.as_ref(),
            G_COLLECT_ALL,
            &[
                G_COLLECT_PROJECTS,
                G_COLLECT_SEEDS,
                G_COLLECT_SHOOTS,
                G_COLLECT_CLOUD_PROFILE_IMAGES,
            ],
            &ctx.task_options,
        )
        .await;
        Ok(())
    }
}

pub fn register(ctx: &RegistrationContext) -> InventoryResult<()> {
    let config = &ctx.config.gardener;
    if !config.enabled {
        info!("Gardener 采集未启用");
        return Ok(());
    }

    let provider = ctx.provider(GARDENER_SOURCE, &config.queue)?;
    for descriptor in [PROJECTS_METRIC, SEEDS_METRIC, SHOOTS_METRIC, IMAGES_METRIC] {
        ctx.describe(descriptor)?;
    }

    ctx.register_task(G_COLLECT_PROJECTS, Arc::new(CollectProjects(provider.clone())))?;
    ctx.register_task(G_COLLECT_SEEDS, Arc::new(CollectSeeds(provider.clone())))?;
    ctx.register_task(G_COLLECT_SHOOTS, Arc::new(CollectShoots(provider.clone())))?;
    ctx.register_task(
        G_COLLECT_CLOUD_PROFILE_IMAGES,
        Arc::new(CollectCloudProfileImages(provider.clone())),
    )?;
    ctx.register_task(G_COLLECT_ALL, Arc::new(CollectAll(provider)))?;

    if ctx.config.scheduler.default_jobs {
        ctx.register_job(
            PeriodicJob::new("@every 1h", G_COLLECT_ALL)
                .with_queue(config.queue.as_str())
                .with_description("Collect all Gardener resources"),
        )?;
    }
    Ok(())
}
