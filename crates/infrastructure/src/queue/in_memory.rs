use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inventory_core::{
    config::RetryConfig,
    models::{Task, TaskInfo, TaskState, MAX_DURATION_SECONDS},
    traits::TaskQueue,
    Clock, InventoryError, InventoryResult, SystemClock,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::retry::retry_delay;

/// active 任务的租约在超时时间之外额外保留的时长
const LEASE_GRACE_SECONDS: i64 = 60;

#[derive(Debug)]
struct StoredTask {
    info: TaskInfo,
    seq: u64,
    lease_until: Option<DateTime<Utc>>,
}

impl StoredTask {
    fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.info.state {
            TaskState::Pending => true,
            TaskState::Scheduled | TaskState::Retry => self.info.process_at <= now,
            TaskState::Active => self.lease_until.is_some_and(|until| until <= now),
            TaskState::Archived | TaskState::Completed => false,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: HashMap<String, StoredTask>,
    paused: HashSet<String>,
    next_seq: u64,
}

/// 内存任务队列
///
/// 适用于 scheduler 与 worker 在同一进程中运行的嵌入式部署，也是测试中的队列实现。
/// 进程退出后队列内容丢失。
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskQueue {
    pub fn new(retry: RetryConfig) -> Self {
        Self::with_clock(retry, Arc::new(SystemClock))
    }

    pub fn with_clock(retry: RetryConfig, clock: Arc<dyn Clock>) -> Self {
        info!("Creating in-memory task queue");
        Self {
            state: Mutex::new(QueueState::default()),
            retry,
            clock,
        }
    }

    fn not_found(id: &str) -> InventoryError {
        InventoryError::task_not_found(id)
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> InventoryResult<TaskInfo> {
        let now = self.clock.now();
        let id = task
            .options
            .task_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&id) {
            return Err(InventoryError::queue_error(format!("任务ID已存在: {id}")));
        }

        let process_at = task.options.process_at.unwrap_or(now);
        let info = TaskInfo {
            id: id.clone(),
            name: task.name,
            payload: task.payload,
            queue: task.options.queue,
            state: if process_at > now {
                TaskState::Scheduled
            } else {
                TaskState::Pending
            },
            max_retry: task.options.max_retry,
            retried: 0,
            timeout_seconds: task.options.timeout.as_secs().min(MAX_DURATION_SECONDS),
            last_error: None,
            process_at,
            created_at: now,
            completed_at: None,
        };

        let seq = state.next_seq;
        state.next_seq += 1;
        state.tasks.insert(
            id,
            StoredTask {
                info: info.clone(),
                seq,
                lease_until: None,
            },
        );

        debug!(task.id = %info.id, task.name = %info.name, task.queue = %info.queue, "任务已入队");
        Ok(info)
    }

    async fn dequeue(&self, queues: &[String]) -> InventoryResult<Option<TaskInfo>> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let paused = state.paused.clone();

        let next_id = state
            .tasks
            .values()
            .filter(|t| queues.contains(&t.info.queue) && !paused.contains(&t.info.queue))
            .filter(|t| t.is_ready(now))
            .min_by_key(|t| (t.info.process_at, t.seq))
            .map(|t| t.info.id.clone());

        let Some(id) = next_id else {
            return Ok(None);
        };

        let Some(stored) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if stored.info.state == TaskState::Active {
            warn!(task.id = %id, task.name = %stored.info.name, "任务租约已过期，重新投递");
        }
        let lease = stored.info.timeout_seconds.min(MAX_DURATION_SECONDS) as i64 + LEASE_GRACE_SECONDS;
        stored.info.state = TaskState::Active;
        stored.lease_until = Some(now + Duration::seconds(lease));
        Ok(Some(stored.info.clone()))
    }

    async fn complete(&self, id: &str) -> InventoryResult<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let stored = state.tasks.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        if stored.info.state != TaskState::Active {
            return Err(InventoryError::queue_error(format!(
                "任务 {id} 状态为 {}，无法标记完成",
                stored.info.state
            )));
        }
        stored.info.state = TaskState::Completed;
        stored.info.completed_at = Some(now);
        stored.lease_until = None;
        Ok(())
    }

    async fn fail(&self, id: &str, error: &str, retryable: bool) -> InventoryResult<TaskState> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let stored = state.tasks.get_mut(id).ok_or_else(|| Self::not_found(id))?;

        stored.info.last_error = Some(error.to_string());
        stored.lease_until = None;

        if retryable && stored.info.retried < stored.info.max_retry {
            let delay = retry_delay(&self.retry, stored.info.retried);
            stored.info.retried += 1;
            stored.info.state = TaskState::Retry;
            stored.info.process_at =
                now + Duration::from_std(delay).unwrap_or_else(|_| Duration::seconds(0));
        } else {
            stored.info.state = TaskState::Archived;
            stored.info.completed_at = Some(now);
        }

        Ok(stored.info.state)
    }

    async fn get(&self, id: &str) -> InventoryResult<Option<TaskInfo>> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(id).map(|t| t.info.clone()))
    }

    async fn list(
        &self,
        queue: Option<&str>,
        task_state: Option<TaskState>,
    ) -> InventoryResult<Vec<TaskInfo>> {
        let state = self.state.lock().await;
        let mut tasks: Vec<&StoredTask> = state
            .tasks
            .values()
            .filter(|t| queue.map_or(true, |q| t.info.queue == q))
            .filter(|t| task_state.map_or(true, |s| t.info.state == s))
            .collect();
        tasks.sort_by_key(|t| t.seq);
        Ok(tasks.into_iter().map(|t| t.info.clone()).collect())
    }

    async fn cancel(&self, id: &str) -> InventoryResult<()> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let stored = state.tasks.get_mut(id).ok_or_else(|| Self::not_found(id))?;
        if !stored.info.state.is_waiting() {
            return Err(InventoryError::queue_error(format!(
                "任务 {id} 状态为 {}，只能取消尚未执行的任务",
                stored.info.state
            )));
        }
        stored.info.state = TaskState::Archived;
        stored.info.last_error = Some("cancelled".to_string());
        stored.info.completed_at = Some(now);
        Ok(())
    }

    async fn delete(&self, id: &str) -> InventoryResult<()> {
        let mut state = self.state.lock().await;
        match state.tasks.get(id) {
            None => Err(Self::not_found(id)),
            Some(t) if t.info.state == TaskState::Active => Err(InventoryError::queue_error(
                format!("任务 {id} 正在执行，无法删除"),
            )),
            Some(_) => {
                state.tasks.remove(id);
                Ok(())
            }
        }
    }

    async fn pause(&self, queue: &str) -> InventoryResult<()> {
        self.state.lock().await.paused.insert(queue.to_string());
        info!(queue = queue, "队列已暂停");
        Ok(())
    }

    async fn resume(&self, queue: &str) -> InventoryResult<()> {
        self.state.lock().await.paused.remove(queue);
        info!(queue = queue, "队列已恢复");
        Ok(())
    }

    async fn drain(&self, queue: &str) -> InventoryResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.tasks.len();
        state
            .tasks
            .retain(|_, t| !(t.info.queue == queue && t.info.state.is_waiting()));
        let removed = (before - state.tasks.len()) as u64;
        info!(queue = queue, removed = removed, "队列已清空");
        Ok(removed)
    }
}
