use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use inventory_collectors::{
    aws::account_scope, register_all, RegistrationContext, AWS_SOURCE, GARDENER_SOURCE,
};
use inventory_core::{
    config::{AppConfig, QueueBackend},
    models::PeriodicJob,
    traits::{ResourceSource, TaskQueue, TaskRegistry},
    Clock, SystemClock,
};
use inventory_dispatcher::{merge_periodic_jobs, Scheduler};
use inventory_infrastructure::{
    credentials::source_from_config,
    database::create_pool,
    observability::{install_metrics_recorder, LatestValueCollector, MetricsServer},
    HttpResourceSource, InMemoryTaskQueue, PostgresResourceStore, PostgresTaskQueue,
    SessionCache, SessionRefresher,
};
use inventory_worker::Worker;

/// 需要启动的长期运行组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components {
    pub scheduler: bool,
    pub worker: bool,
}

impl Components {
    pub const ALL: Self = Self {
        scheduler: true,
        worker: true,
    };
    pub const SCHEDULER: Self = Self {
        scheduler: true,
        worker: false,
    };
    pub const WORKER: Self = Self {
        scheduler: false,
        worker: true,
    };
}

/// 组合根：按配置构造队列、存储、会话缓存和数据源，并完成任务注册
pub struct Application {
    config: Arc<AppConfig>,
    clock: Arc<dyn Clock>,
    queue: Arc<dyn TaskQueue>,
    sessions: Arc<SessionCache>,
    metrics: Arc<LatestValueCollector>,
    tasks: Arc<TaskRegistry>,
    jobs: Vec<PeriodicJob>,
}

impl Application {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let config = Arc::new(config);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let pool = create_pool(&config.database)
            .await
            .context("连接数据库失败")?;

        let queue: Arc<dyn TaskQueue> = match config.queue.backend {
            QueueBackend::Memory => Arc::new(InMemoryTaskQueue::with_clock(
                config.queue.retry.clone(),
                clock.clone(),
            )),
            QueueBackend::Postgres => Arc::new(PostgresTaskQueue::new(
                pool.clone(),
                config.queue.retry.clone(),
            )),
        };
        info!(queue.backend = ?config.queue.backend, "任务队列已创建");

        let sessions = Arc::new(create_session_cache(&config, clock.clone())?);
        let metrics = Arc::new(LatestValueCollector::new());

        let mut ctx = RegistrationContext::new(
            config.clone(),
            queue.clone(),
            Arc::new(PostgresResourceStore::new(pool)),
            metrics.clone(),
        );
        for (name, source) in create_sources(&config, &sessions)? {
            ctx = ctx.with_source(name, source);
        }

        register_all(&ctx).context("注册任务处理器失败")?;
        let jobs = merge_periodic_jobs(ctx.default_jobs(), config.scheduler.jobs.clone())
            .context("合并周期任务失败")?;

        Ok(Self {
            config,
            clock,
            queue,
            sessions,
            metrics,
            tasks: ctx.tasks.clone(),
            jobs,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// 合并后的周期任务，默认任务在前
    pub fn jobs(&self) -> &[PeriodicJob] {
        &self.jobs
    }

    /// 运行到取消令牌触发，并等待所有组件退出
    pub async fn run(self, components: Components, cancel: CancellationToken) -> Result<()> {
        if self.config.queue.backend == QueueBackend::Memory && components != Components::ALL {
            warn!("内存队列只在进程内可见，调度器与Worker应在同一进程中运行");
        }

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        for session in &self.config.credentials.sessions {
            if !session.background_refresh {
                continue;
            }
            let refresher = SessionRefresher::new(
                self.sessions.clone(),
                session.name.clone(),
                self.config.credentials.refresh_fraction,
                self.config.credentials.retry_interval(),
            );
            handles.push(refresher.spawn(cancel.child_token()));
        }

        if self.config.metrics.enabled {
            let address: SocketAddr = self
                .config
                .metrics
                .bind_address
                .parse()
                .with_context(|| format!("无效的指标监听地址: {}", self.config.metrics.bind_address))?;
            let handle = install_metrics_recorder()
                .map_err(|e| warn!(error = %e, "进程指标不可用"))
                .ok();
            let server = MetricsServer::new(
                address,
                self.config.metrics.path.clone(),
                handle,
                self.metrics.clone(),
            );
            let token = cancel.child_token();
            handles.push(tokio::spawn(async move {
                if let Err(e) = server.serve(token).await {
                    error!(error = %e, "指标服务运行失败");
                }
            }));
        }

        if components.scheduler {
            if self.config.scheduler.enabled {
                let scheduler = Scheduler::new(
                    self.queue.clone(),
                    self.jobs.clone(),
                    self.clock.clone(),
                )?
                .with_queue_config(&self.config.queue);
                handles.push(tokio::spawn(scheduler.run(cancel.child_token())));
            } else {
                warn!("调度器已在配置中禁用");
            }
        }

        if components.worker {
            if self.config.worker.enabled {
                let worker = Worker::new(self.queue.clone(), &self.tasks, &self.config.worker);
                let token = cancel.child_token();
                handles.push(tokio::spawn(async move {
                    if let Err(e) = worker.run(token).await {
                        error!(error = %e, "Worker运行失败");
                    }
                }));
            } else {
                warn!("Worker已在配置中禁用");
            }
        }

        info!(
            scheduler = components.scheduler,
            worker = components.worker,
            "所有组件已启动"
        );
        cancel.cancelled().await;

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "组件退出异常");
            }
        }
        info!("所有组件已停止");
        Ok(())
    }
}

fn create_session_cache(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<SessionCache> {
    let credentials = &config.credentials;
    let cache = SessionCache::new(clock.clone(), credentials.safety_margin());
    for session in &credentials.sessions {
        let source = source_from_config(session, credentials.request_timeout(), clock.clone())?;
        cache.register_source(session.name.clone(), source)?;
    }
    info!(sessions = ?cache.names(), "会话来源已注册");
    Ok(cache)
}

/// 每个启用的数据源一个 HTTP 来源；AWS 按账号绑定会话
fn create_sources(
    config: &AppConfig,
    sessions: &Arc<SessionCache>,
) -> Result<Vec<(&'static str, Arc<dyn ResourceSource>)>> {
    let timeout = config.credentials.request_timeout();
    let mut sources: Vec<(&'static str, Arc<dyn ResourceSource>)> = Vec::new();

    if config.gardener.enabled {
        let source = HttpResourceSource::new(&config.gardener.endpoint, sessions.clone(), timeout)?
            .with_default_session(&config.gardener.credentials);
        sources.push((GARDENER_SOURCE, Arc::new(source)));
    }

    if config.aws.enabled {
        let source = HttpResourceSource::new(&config.aws.endpoint, sessions.clone(), timeout)?;
        for account in &config.aws.accounts {
            let session = config
                .aws
                .credentials_for(&account.account_id)
                .with_context(|| format!("AWS账号 {} 没有可用的凭据会话", account.account_id))?;
            source.bind(account_scope(&account.account_id).provider, session)?;
        }
        sources.push((AWS_SOURCE, Arc::new(source)));
    }

    Ok(sources)
}

/// 执行内置的数据库迁移
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("数据库迁移失败")?;
    info!("数据库迁移完成");
    Ok(())
}
