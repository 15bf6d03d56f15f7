//! AWS 采集任务
//!
//! 区域按配置的账号扇出；VPC 与实例按已采集的 (区域, 账号) 扇出。
//! 采集范围为 `aws/<account_id>`，凭据按账号绑定。

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
    task_names::{AWS_COLLECT_ALL, AWS_COLLECT_INSTANCES, AWS_COLLECT_REGIONS, AWS_COLLECT_VPCS},
    AccountPayload, AwsInstance, AwsRegion, AwsVpc, RegionPayload,
};
use inventory_infrastructure::observability::MetricDescriptor;
use inventory_worker::{enqueue_all, fan_out};

use crate::collect::{collect, Collection};
use crate::context::{ProviderContext, RegistrationContext, AWS_SOURCE};

pub const REGIONS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_aws_regions",
    help: "AWS regions written by the last collection, per account",
    labels: &["account_id"],
};
pub const VPCS_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_aws_vpcs",
    help: "AWS VPCs written by the last collection, per account and region",
    labels: &["account_id", "region"],
};
pub const INSTANCES_METRIC: MetricDescriptor = MetricDescriptor {
    name: "inventory_aws_instances",
    help: "AWS instances written by the last collection, per account and region",
    labels: &["account_id", "region"],
};

/// 账号的采集范围
pub fn account_scope(account_id: &str) -> Scope {
    Scope::new(format!("aws/{account_id}"))
}

fn invalid(task: &TaskInfo, field: &str) -> InventoryError {
    InventoryError::invalid_payload(format!("任务 {} 的负载字段 {field} 为空", task.name))
        .skip_retry()
}

fn decode_region(task: &TaskInfo) -> InventoryResult<RegionPayload> {
    let payload: RegionPayload = task.decode_payload()?;
    if payload.account_id.trim().is_empty() {
        return Err(invalid(task, "account_id"));
    }
    if payload.region.trim().is_empty() {
        return Err(invalid(task, "region"));
    }
    Ok(payload)
}

/// 已采集的 (区域, 账号) 组合
async fn known_regions(ctx: &ProviderContext) -> InventoryResult<Vec<RegionPayload>> {
    let rows = ctx.store.select(AwsRegion::TABLE, &["name", "account_id"]).await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match (row.first()?.as_text(), row.get(1)?.as_text()) {
            (Some(region), Some(account)) => Some(RegionPayload {
                account_id: account.to_string(),
                region: region.to_string(),
            }),
            _ => None,
        })
        .collect())
}

/// 无负载时按配置的账号扇出
pub struct CollectRegions {
    pub ctx: Arc<ProviderContext>,
    pub accounts: Vec<String>,
}

#[async_trait]
impl TaskHandler for CollectRegions {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.ctx;

        if !task.has_payload() {
            let payloads: Vec<AccountPayload> = self
                .accounts
                .iter()
                .map(|account_id| AccountPayload {
                    account_id: account_id.clone(),
                })
                .collect();
            fan_out(
                ctx.queue.as_ref(),
                AWS_COLLECT_REGIONS,
                AWS_COLLECT_REGIONS,
                payloads,
                &ctx.task_options,
            )
            .await;
            return Ok(());
        }

        let payload: AccountPayload = task.decode_payload()?;
        if payload.account_id.trim().is_empty() {
            return Err(invalid(task, "account_id"));
        }
        let account = payload.account_id;

        collect::<AwsRegion>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: AWS_COLLECT_REGIONS,
                kind: "regions",
                scope: account_scope(&account),
                partition: account.clone(),
                metric: REGIONS_METRIC.name,
                labels: vec![account.clone()],
            },
            &move |item: &Value| mapping::region(&account, item),
        )
        .await?;
        Ok(())
    }
}

pub struct CollectVpcs(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectVpcs {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;

        if !task.has_payload() {
            let regions = known_regions(ctx).await?;
            fan_out(
                ctx.queue.as_ref(),
                AWS_COLLECT_VPCS,
                AWS_COLLECT_VPCS,
                regions,
                &ctx.task_options,
            )
            .await;
            return Ok(());
        }

        let payload = decode_region(task)?;
        let partition = payload.partition();
        let RegionPayload { account_id, region } = payload;

        collect::<AwsVpc>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: AWS_COLLECT_VPCS,
                kind: "vpcs",
                scope: account_scope(&account_id).with("region", region.as_str()),
                partition,
                metric: VPCS_METRIC.name,
                labels: vec![account_id.clone(), region.clone()],
            },
            &move |item: &Value| mapping::vpc(&account_id, &region, item),
        )
        .await?;
        Ok(())
    }
}

pub struct CollectInstances(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectInstances {
    async fn handle(&self, task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;

        if !task.has_payload() {
            let regions = known_regions(ctx).await?;
            fan_out(
                ctx.queue.as_ref(),
                AWS_COLLECT_INSTANCES,
                AWS_COLLECT_INSTANCES,
                regions,
                &ctx.task_options,
            )
            .await;
            return Ok(());
        }

        let payload = decode_region(task)?;
        let partition = payload.partition();
        let RegionPayload { account_id, region } = payload;

        collect::<AwsInstance>(
            ctx.source.as_ref(),
            ctx.store.as_ref(),
            &ctx.metrics,
            Collection {
                task: AWS_COLLECT_INSTANCES,
                kind: "instances",
                scope: account_scope(&account_id).with("region", region.as_str()),
                partition,
                metric: INSTANCES_METRIC.name,
                labels: vec![account_id.clone(), region.clone()],
            },
            &move |item: &Value| mapping::instances(&account_id, &region, item),
        )
        .await?;
        Ok(())
    }
}

pub struct CollectAll(pub Arc<ProviderContext>);

#[async_trait]
impl TaskHandler for CollectAll {
    async fn handle(&self, _task: &TaskInfo) -> InventoryResult<()> {
        let ctx = &self.0;
        enqueue_all(
            ctx.queue.as_ref(),
            AWS_COLLECT_ALL,
            &[AWS_COLLECT_REGIONS, AWS_COLLECT_VPCS, AWS_COLLECT_INSTANCES],
            &ctx.task_options,
        )
        .await;
        Ok(())
    }
}

pub fn register(ctx: &RegistrationContext) -> InventoryResult<()> {
    let config = &ctx.config.aws;
    if !config.enabled {
        info!("AWS 采集未启用");
        return Ok(());
    }

    let provider = ctx.provider(AWS_SOURCE, &config.queue)?;
    for descriptor in [REGIONS_METRIC, VPCS_METRIC, INSTANCES_METRIC] {
        ctx.describe(descriptor)?;
    }

    let accounts = config.accounts.iter().map(|a| a.account_id.clone()).collect();
    ctx.register_task(
        AWS_COLLECT_REGIONS,
        Arc::new(CollectRegions {
            ctx: provider.clone(),
            accounts,
        }),
    )?;
    ctx.register_task(AWS_COLLECT_VPCS, Arc::new(CollectVpcs(provider.clone())))?;
    ctx.register_task(AWS_COLLECT_INSTANCES, Arc::new(CollectInstances(provider.clone())))?;
    ctx.register_task(AWS_COLLECT_ALL, Arc::new(CollectAll(provider)))?;

    if ctx.config.scheduler.default_jobs {
        ctx.register_job(
            PeriodicJob::new("@every 1h", AWS_COLLECT_ALL)
                .with_queue(config.queue.as_str())
                .with_description("Collect all AWS resources"),
        )?;
    }
    Ok(())
}
