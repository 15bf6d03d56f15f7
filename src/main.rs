use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use inventory::{
    app::{migrate, Application, Components},
    cli::{
        ensure_shared_queue, Cli, Commands, ComponentActions, DbActions, PeriodicActions,
        QueueActions, TaskActions,
    },
    shutdown::install_shutdown_handler,
};
use inventory_core::{
    config::AppConfig,
    models::{Task, TaskInfo, TaskState},
};
use inventory_infrastructure::{database::create_pool, observability::init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    init_logging(&config.logging)?;
    ensure_shared_queue(&config, &cli.command)?;

    match cli.command {
        Commands::Start => start(config, Components::ALL).await,
        Commands::Scheduler(cmd) => match cmd.action {
            ComponentActions::Start => start(config, Components::SCHEDULER).await,
        },
        Commands::Worker(cmd) => match cmd.action {
            ComponentActions::Start => start(config, Components::WORKER).await,
        },
        Commands::Db(cmd) => match cmd.action {
            DbActions::Migrate => {
                let pool = create_pool(&config.database).await?;
                migrate(&pool).await
            }
        },
        Commands::Task(cmd) => task_command(Application::new(config).await?, cmd.action).await,
        Commands::Queue(cmd) => queue_command(Application::new(config).await?, cmd.action).await,
        Commands::Periodic(cmd) => match cmd.action {
            PeriodicActions::List => {
                let app = Application::new(config).await?;
                for job in app.jobs() {
                    println!(
                        "{:<16} {:<36} queue={} {}",
                        job.spec, job.task_name, job.queue, job.description
                    );
                }
                Ok(())
            }
        },
    }
}

async fn start(config: AppConfig, components: Components) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "启动资源清单采集系统");
    let cancel = install_shutdown_handler();
    let app = Application::new(config).await?;
    app.run(components, cancel).await?;
    info!("资源清单采集系统已退出");
    Ok(())
}

fn print_task(task: &TaskInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(task)?);
    Ok(())
}

async fn task_command(app: Application, action: TaskActions) -> Result<()> {
    let queue = app.queue();
    match action {
        TaskActions::Enqueue {
            name,
            payload,
            queue: target,
        } => {
            if !app.tasks().contains(&name) {
                anyhow::bail!("未注册的任务: {name}");
            }
            let payload = match payload {
                Some(raw) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&raw).context("负载不是有效的JSON")?;
                    serde_json::to_vec(&value)?
                }
                None => Vec::new(),
            };
            let config = &app.config().queue;
            let task = Task::new(name, payload)
                .with_queue(target.unwrap_or_else(|| config.default_queue.clone()))
                .with_timeout(config.timeout())
                .with_max_retry(config.max_retry);
            print_task(&queue.enqueue(task).await?)
        }
        TaskActions::Inspect { id } => match queue.get(&id).await? {
            Some(task) => print_task(&task),
            None => anyhow::bail!("任务不存在: {id}"),
        },
        TaskActions::List {
            queue: filter,
            state,
        } => {
            let state = state.map(|s| s.parse::<TaskState>()).transpose()?;
            for task in queue.list(filter.as_deref(), state).await? {
                println!(
                    "{}  {:<10} {:<12} {:<36} retried={} {}",
                    task.id,
                    task.state,
                    task.queue,
                    task.name,
                    task.retried,
                    task.payload_lossy()
                );
            }
            Ok(())
        }
        TaskActions::Cancel { id } => {
            queue.cancel(&id).await?;
            println!("已取消: {id}");
            Ok(())
        }
        TaskActions::Delete { id } => {
            queue.delete(&id).await?;
            println!("已删除: {id}");
            Ok(())
        }
        TaskActions::Names => {
            let mut names = app.tasks().keys();
            names.sort();
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
    }
}

async fn queue_command(app: Application, action: QueueActions) -> Result<()> {
    let queue = app.queue();
    match action {
        QueueActions::Pause { queue: name } => {
            queue.pause(&name).await?;
            println!("队列已暂停: {name}");
        }
        QueueActions::Resume { queue: name } => {
            queue.resume(&name).await?;
            println!("队列已恢复: {name}");
        }
        QueueActions::Drain { queue: name } => {
            let removed = queue.drain(&name).await?;
            println!("队列 {name} 已清空，删除 {removed} 个任务");
        }
    }
    Ok(())
}
