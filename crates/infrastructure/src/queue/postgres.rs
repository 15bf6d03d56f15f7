use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    config::RetryConfig,
    models::{Task, TaskInfo, TaskState, MAX_DURATION_SECONDS},
    traits::TaskQueue,
    InventoryError, InventoryResult,
};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{debug, info, instrument};

use super::retry::retry_delay;

const TASK_COLUMNS: &str = "id, name, payload, queue, state, max_retry, retried, timeout_seconds, \
                            last_error, process_at, created_at, completed_at";

/// 基于PostgreSQL的任务队列
///
/// 多个 worker 进程通过 `FOR UPDATE SKIP LOCKED` 竞争租约，同一任务同一时刻只会被一个进程领取。
pub struct PostgresTaskQueue {
    pool: PgPool,
    retry: RetryConfig,
}

impl PostgresTaskQueue {
    pub fn new(pool: PgPool, retry: RetryConfig) -> Self {
        Self { pool, retry }
    }

    fn row_to_task_info(row: &PgRow) -> InventoryResult<TaskInfo> {
        let state: String = row.try_get("state")?;
        let max_retry: i32 = row.try_get("max_retry")?;
        let retried: i32 = row.try_get("retried")?;
        let timeout_seconds: i64 = row.try_get("timeout_seconds")?;

        Ok(TaskInfo {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            payload: row.try_get("payload")?,
            queue: row.try_get("queue")?,
            state: state.parse()?,
            max_retry: u32::try_from(max_retry).unwrap_or_default(),
            retried: u32::try_from(retried).unwrap_or_default(),
            timeout_seconds: u64::try_from(timeout_seconds).unwrap_or_default(),
            last_error: row.try_get("last_error")?,
            process_at: row.try_get("process_at")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }

    fn to_i32(value: u32) -> i32 {
        i32::try_from(value).unwrap_or(i32::MAX)
    }
}

#[async_trait]
impl TaskQueue for PostgresTaskQueue {
    #[instrument(skip(self, task), fields(task.name = %task.name, task.queue = %task.options.queue))]
    async fn enqueue(&self, task: Task) -> InventoryResult<TaskInfo> {
        let id = task
            .options
            .task_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let timeout_seconds = task.options.timeout.as_secs().min(MAX_DURATION_SECONDS) as i64;

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO inventory_tasks (id, name, payload, queue, state, max_retry, timeout_seconds, process_at)
            VALUES ($1, $2, $3, $4,
                    CASE WHEN $5::timestamptz > now() THEN 'scheduled' ELSE 'pending' END,
                    $6, $7, COALESCE($5::timestamptz, now()))
            ON CONFLICT (id) DO NOTHING
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&task.name)
        .bind(&task.payload)
        .bind(&task.options.queue)
        .bind(task.options.process_at)
        .bind(Self::to_i32(task.options.max_retry))
        .bind(timeout_seconds)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| InventoryError::queue_error(format!("任务ID已存在: {id}")))?;
        let info = Self::row_to_task_info(&row)?;
        debug!(task.id = %info.id, "任务已入队");
        Ok(info)
    }

    #[instrument(skip(self))]
    async fn dequeue(&self, queues: &[String]) -> InventoryResult<Option<TaskInfo>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE inventory_tasks
            SET state = 'active',
                lease_until = now() + make_interval(secs => (timeout_seconds + 60)::double precision)
            WHERE id = (
                SELECT id FROM inventory_tasks
                WHERE queue = ANY($1)
                  AND queue NOT IN (SELECT queue FROM inventory_paused_queues)
                  AND (
                        state = 'pending'
                     OR (state IN ('scheduled', 'retry') AND process_at <= now())
                     OR (state = 'active' AND lease_until <= now())
                  )
                ORDER BY process_at, created_at
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(queues)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_task_info).transpose()
    }

    async fn complete(&self, id: &str) -> InventoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_tasks
            SET state = 'completed', completed_at = now(), lease_until = NULL
            WHERE id = $1 AND state = 'active'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                None => Err(InventoryError::task_not_found(id)),
                Some(info) => Err(InventoryError::queue_error(format!(
                    "任务 {id} 状态为 {}，无法标记完成",
                    info.state
                ))),
            };
        }
        Ok(())
    }

    #[instrument(skip(self, error))]
    async fn fail(&self, id: &str, error: &str, retryable: bool) -> InventoryResult<TaskState> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT retried, max_retry FROM inventory_tasks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| InventoryError::task_not_found(id))?;
        let retried = u32::try_from(row.try_get::<i32, _>("retried")?).unwrap_or_default();
        let max_retry = u32::try_from(row.try_get::<i32, _>("max_retry")?).unwrap_or_default();

        let state = if retryable && retried < max_retry {
            let delay = retry_delay(&self.retry, retried);
            let process_at: DateTime<Utc> = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            sqlx::query(
                r#"
                UPDATE inventory_tasks
                SET state = 'retry', retried = retried + 1, last_error = $2,
                    process_at = $3, lease_until = NULL
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(error)
            .bind(process_at)
            .execute(&mut *tx)
            .await?;
            TaskState::Retry
        } else {
            sqlx::query(
                r#"
                UPDATE inventory_tasks
                SET state = 'archived', last_error = $2, completed_at = now(), lease_until = NULL
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(error)
            .execute(&mut *tx)
            .await?;
            TaskState::Archived
        };

        tx.commit().await?;
        Ok(state)
    }

    async fn get(&self, id: &str) -> InventoryResult<Option<TaskInfo>> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM inventory_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_task_info).transpose()
    }

    async fn list(
        &self,
        queue: Option<&str>,
        state: Option<TaskState>,
    ) -> InventoryResult<Vec<TaskInfo>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM inventory_tasks
            WHERE ($1::text IS NULL OR queue = $1)
              AND ($2::text IS NULL OR state = $2)
            ORDER BY created_at, id
            "#
        ))
        .bind(queue)
        .bind(state.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_task_info).collect()
    }

    async fn cancel(&self, id: &str) -> InventoryResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_tasks
            SET state = 'archived', last_error = 'cancelled', completed_at = now()
            WHERE id = $1 AND state IN ('pending', 'scheduled', 'retry')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                None => Err(InventoryError::task_not_found(id)),
                Some(info) => Err(InventoryError::queue_error(format!(
                    "任务 {id} 状态为 {}，只能取消尚未执行的任务",
                    info.state
                ))),
            };
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> InventoryResult<()> {
        let result = sqlx::query("DELETE FROM inventory_tasks WHERE id = $1 AND state <> 'active'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                None => Err(InventoryError::task_not_found(id)),
                Some(_) => Err(InventoryError::queue_error(format!(
                    "任务 {id} 正在执行，无法删除"
                ))),
            };
        }
        Ok(())
    }

    async fn pause(&self, queue: &str) -> InventoryResult<()> {
        sqlx::query("INSERT INTO inventory_paused_queues (queue) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(queue)
            .execute(&self.pool)
            .await?;
        info!(queue = queue, "队列已暂停");
        Ok(())
    }

    async fn resume(&self, queue: &str) -> InventoryResult<()> {
        sqlx::query("DELETE FROM inventory_paused_queues WHERE queue = $1")
            .bind(queue)
            .execute(&self.pool)
            .await?;
        info!(queue = queue, "队列已恢复");
        Ok(())
    }

    async fn drain(&self, queue: &str) -> InventoryResult<u64> {
        let result = sqlx::query(
            "DELETE FROM inventory_tasks WHERE queue = $1 AND state IN ('pending', 'scheduled', 'retry')",
        )
        .bind(queue)
        .execute(&self.pool)
        .await?;
        let removed = result.rows_affected();
        info!(queue = queue, removed = removed, "队列已清空");
        Ok(removed)
    }
}
