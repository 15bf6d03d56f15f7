//! "只报告最新值" 的 gauge 采集器
//!
//! 任务处理器每个周期为自己的 (任务, 分区) 登记一个样本；每次抓取输出所有待发送样本后立即清除。
//! 某个分区在本周期没有登记样本时，下次抓取不会出现它，而不是保留上一次的旧值。

use inventory_core::{Registry, RegistryError};
use prometheus::{core::Collector, proto::MetricFamily, GaugeVec, Opts, TextEncoder};
use tracing::warn;

/// 静态指标描述，启动时登记一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric: &'static str,
    /// 与描述中的 `labels` 一一对应
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    pub fn new(metric: &'static str, label_values: Vec<String>, value: f64) -> Self {
        Self {
            metric,
            label_values,
            value,
        }
    }
}

/// 待发送样本的键：同一任务同一分区只保留最新一次登记
pub fn sample_key(task: &str, partition: &str) -> String {
    format!("{task}/{partition}")
}

#[derive(Default)]
pub struct LatestValueCollector {
    descriptors: Registry<&'static str, MetricDescriptor>,
    pending: Registry<String, MetricSample>,
}

impl LatestValueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe(&self, descriptor: MetricDescriptor) -> Result<(), RegistryError> {
        self.descriptors.register(descriptor.name, descriptor)
    }

    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        let mut descriptors: Vec<MetricDescriptor> =
            self.descriptors.snapshot().into_iter().map(|(_, d)| d).collect();
        descriptors.sort_by_key(|d| d.name);
        descriptors
    }

    /// 登记样本，覆盖同键的旧样本
    pub fn add_metric(&self, key: impl Into<String>, sample: MetricSample) {
        let Some(descriptor) = self.descriptors.get(sample.metric) else {
            warn!(metric = sample.metric, "指标未登记描述，样本被丢弃");
            return;
        };
        if descriptor.labels.len() != sample.label_values.len() {
            warn!(
                metric = sample.metric,
                expected = descriptor.labels.len(),
                actual = sample.label_values.len(),
                "指标标签数量不匹配，样本被丢弃"
            );
            return;
        }
        self.pending.overwrite(key.into(), sample);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 取出并清除所有待发送样本
    ///
    /// 先快照键，再逐个 `unregister`；只有真正移除了样本的一方会输出它，
    /// 并发抓取不会重复输出，快照之后新登记的样本留给下一次抓取。
    pub fn collect(&self) -> Vec<MetricSample> {
        let mut samples: Vec<MetricSample> = self
            .pending
            .keys()
            .into_iter()
            .filter_map(|key| self.pending.unregister(&key))
            .collect();
        samples.sort_by(|a, b| {
            a.metric
                .cmp(b.metric)
                .then_with(|| a.label_values.cmp(&b.label_values))
        });
        samples
    }

    /// 取出待发送样本并转换为 Prometheus 指标族；本周期没有样本的指标不输出
    pub fn gather(&self) -> Vec<MetricFamily> {
        let samples = self.collect();
        let mut families = Vec::new();

        for descriptor in self.descriptors() {
            let mut owned = samples.iter().filter(|s| s.metric == descriptor.name).peekable();
            if owned.peek().is_none() {
                continue;
            }
            let gauges = match GaugeVec::new(
                Opts::new(descriptor.name, descriptor.help),
                descriptor.labels,
            ) {
                Ok(gauges) => gauges,
                Err(e) => {
                    warn!(metric = descriptor.name, error = %e, "指标描述无效，跳过");
                    continue;
                }
            };
            for sample in owned {
                let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
                match gauges.get_metric_with_label_values(&values) {
                    Ok(gauge) => gauge.set(sample.value),
                    Err(e) => warn!(metric = descriptor.name, error = %e, "样本标签无效，丢弃"),
                }
            }
            families.extend(gauges.collect());
        }

        families
    }

    /// Prometheus 文本格式输出，并清除已输出的样本
    pub fn render(&self) -> String {
        let families = self.gather();
        match TextEncoder::new().encode_to_string(&families) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "最新值指标编码失败");
                String::new()
            }
        }
    }
}
