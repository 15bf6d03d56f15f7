//! 采集-去重-upsert 流水线
//!
//! 1. 逐页拉取原始记录，映射为行类型；无法映射（缺少自然键字段或格式错误）的记录告警后丢弃
//! 2. 按自然键排序去重，同键多条时取整行排序最小的一条
//! 3. 单条语句 upsert 去重后的批次；空批次不写库
//! 4. 以受影响行数登记最新值指标，分区为逻辑父资源，没有数据时登记 0

use serde_json::Value;
use tracing::{debug, warn};

use inventory_core::{
    models::{Record, UpsertBatch, UpsertStats},
    traits::{ResourceSource, ResourceStore, Scope},
    InventoryResult,
};
use inventory_infrastructure::observability::{
    latest_value::sample_key, LatestValueCollector, MetricSample, StructuredLogger,
};

use crate::raw::Unmappable;

/// 一次采集的描述
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    pub task: &'a str,
    pub kind: &'a str,
    pub scope: Scope,
    pub partition: String,
    pub metric: &'static str,
    /// 与指标描述的标签一一对应
    pub labels: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CollectReport {
    pub fetched: usize,
    pub dropped: usize,
    pub written: usize,
    pub stats: UpsertStats,
}

/// 原始记录到行的映射；一条原始记录可以展开为多行
pub type Mapper<R> = dyn Fn(&Value) -> Vec<Result<R, Unmappable>> + Send + Sync;

/// 读取 (kind, scope) 的全部分页
pub async fn fetch_all(
    source: &dyn ResourceSource,
    kind: &str,
    scope: &Scope,
) -> InventoryResult<Vec<Value>> {
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = source.fetch_page(kind, scope, token.as_deref()).await?;
        items.extend(page.items);
        match page.next_page_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    Ok(items)
}

/// 按自然键排序并折叠相同键，结果与到达顺序无关
pub fn dedup_records<R: Record>(mut records: Vec<R>) -> Vec<R> {
    records.sort_by(|a, b| a.natural_key().cmp(&b.natural_key()).then_with(|| a.cmp(b)));
    records.dedup_by(|next, kept| next.natural_key() == kept.natural_key());
    records
}

pub async fn collect<R: Record>(
    source: &dyn ResourceSource,
    store: &dyn ResourceStore,
    metrics: &LatestValueCollector,
    collection: Collection<'_>,
    map: &Mapper<R>,
) -> InventoryResult<CollectReport> {
    let raw = fetch_all(source, collection.kind, &collection.scope).await?;

    let mut report = CollectReport {
        fetched: raw.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(raw.len());
    for item in &raw {
        for mapped in map(item) {
            match mapped {
                Ok(record) => records.push(record),
                Err(reason) => {
                    report.dropped += 1;
                    warn!(
                        task.name = collection.task,
                        table = R::TABLE,
                        partition = %collection.partition,
                        reason = %reason,
                        "记录无法映射，已丢弃"
                    );
                }
            }
        }
    }

    let records = dedup_records(records);
    report.written = records.len();

    if !records.is_empty() {
        report.stats = store.upsert(UpsertBatch::from_records(&records)).await?;
    } else {
        debug!(task.name = collection.task, table = R::TABLE, "没有可写入的记录");
    }

    metrics.add_metric(
        sample_key(collection.task, &collection.partition),
        MetricSample::new(
            collection.metric,
            collection.labels.clone(),
            report.stats.affected() as f64,
        ),
    );
    StructuredLogger::log_collection_completed(
        collection.task,
        &collection.partition,
        report.fetched,
        report.stats.affected(),
    );

    Ok(report)
}
