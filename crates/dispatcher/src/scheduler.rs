use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use inventory_core::{
    config::QueueConfig,
    models::{PeriodicJob, Task, TaskInfo},
    traits::TaskQueue,
    Clock, InventoryResult,
};
use inventory_infrastructure::observability::{StructuredLogger, TaskMetrics};

use crate::cron_utils::JobSchedule;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

struct ScheduledJob {
    job: PeriodicJob,
    schedule: JobSchedule,
    next_fire: Option<DateTime<Utc>>,
}

/// 周期任务调度器
///
/// 每个 tick 检查所有到期的任务并各入队一个新实例；错过的多次触发只补一次。
/// 调度器与 Worker 之间只通过队列通信。
pub struct Scheduler {
    queue: Arc<dyn TaskQueue>,
    jobs: Vec<ScheduledJob>,
    clock: Arc<dyn Clock>,
    task_timeout: Option<Duration>,
    max_retry: Option<u32>,
    metrics: TaskMetrics,
}

impl Scheduler {
    /// 以当前时间为起点计算每个任务的首次触发时间
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        jobs: Vec<PeriodicJob>,
        clock: Arc<dyn Clock>,
    ) -> InventoryResult<Self> {
        let now = clock.now();
        let jobs = jobs
            .into_iter()
            .map(|job| {
                let schedule = JobSchedule::parse(&job.spec)?;
                let next_fire = schedule.next_after(now);
                Ok(ScheduledJob {
                    job,
                    schedule,
                    next_fire,
                })
            })
            .collect::<InventoryResult<Vec<_>>>()?;

        Ok(Self {
            queue,
            jobs,
            clock,
            task_timeout: None,
            max_retry: None,
            metrics: TaskMetrics,
        })
    }

    /// 入队时使用队列配置中的超时和最大重试次数
    pub fn with_queue_config(mut self, config: &QueueConfig) -> Self {
        self.task_timeout = Some(config.timeout());
        self.max_retry = Some(config.max_retry);
        self
    }

    pub fn jobs(&self) -> impl Iterator<Item = &PeriodicJob> {
        self.jobs.iter().map(|j| &j.job)
    }

    pub fn next_fire_times(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.jobs
            .iter()
            .map(|j| (j.job.task_name.clone(), j.next_fire))
            .collect()
    }

    fn build_task(&self, job: &PeriodicJob) -> Task {
        let mut task = Task::new(job.task_name.clone(), job.payload_bytes()).with_queue(job.queue.clone());
        if let Some(timeout) = self.task_timeout {
            task = task.with_timeout(timeout);
        }
        if let Some(max_retry) = self.max_retry {
            task = task.with_max_retry(max_retry);
        }
        task
    }

    /// 入队所有在 `now` 之前到期的任务，返回成功入队的任务
    ///
    /// 单个任务入队失败只记录日志和指标，不影响其他任务。
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<TaskInfo> {
        let mut enqueued = Vec::new();

        for index in 0..self.jobs.len() {
            let due = matches!(self.jobs[index].next_fire, Some(at) if at <= now);
            if !due {
                continue;
            }

            let task = self.build_task(&self.jobs[index].job);
            let entry = &mut self.jobs[index];
            entry.next_fire = entry.schedule.next_after(now);

            match self.queue.enqueue(task).await {
                Ok(info) => {
                    StructuredLogger::log_periodic_job_fired(
                        &entry.job.spec,
                        &info.name,
                        &info.queue,
                        &info.id,
                    );
                    self.metrics.record_enqueued(&info.name, &info.queue);
                    enqueued.push(info);
                }
                Err(e) => {
                    warn!(
                        job.spec = %entry.job.spec,
                        task.name = %entry.job.task_name,
                        error = %e,
                        "周期任务入队失败"
                    );
                    self.metrics
                        .record_periodic_enqueue_failure(&entry.job.task_name);
                }
            }
        }

        enqueued
    }

    /// 运行到取消令牌触发为止
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(jobs = self.jobs.len(), "调度器已启动");
        for job in &self.jobs {
            debug!(
                job.spec = %job.job.spec,
                task.name = %job.job.task_name,
                next_fire = ?job.next_fire,
                "已加载周期任务"
            );
        }

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let now = self.clock.now();
                    self.tick(now).await;
                }
            }
        }

        info!("调度器已停止");
    }
}
