//! 命令行定义

use clap::{Args, Parser, Subcommand};
use inventory_core::config::{AppConfig, QueueBackend};

#[derive(Parser, Debug)]
#[command(name = "inventory")]
#[command(version)]
#[command(about = "跨云资源清单采集系统")]
#[command(long_about = "周期性地从 Gardener 和 AWS 采集资源清单写入 PostgreSQL，并提供队列运维命令")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 配置文件路径，缺省时读取 config/inventory.toml（存在时）
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 在同一进程中运行调度器、Worker 和指标服务
    Start,
    /// 调度器
    Scheduler(ComponentCommands),
    /// Worker
    Worker(ComponentCommands),
    /// 任务管理
    Task(TaskCommands),
    /// 队列管理
    Queue(QueueCommands),
    /// 周期任务
    Periodic(PeriodicCommands),
    /// 数据库
    Db(DbCommands),
}

#[derive(Args, Debug)]
pub struct ComponentCommands {
    #[command(subcommand)]
    pub action: ComponentActions,
}

#[derive(Subcommand, Debug)]
pub enum ComponentActions {
    /// 启动组件（同时启动指标服务）
    Start,
}

#[derive(Args, Debug)]
pub struct TaskCommands {
    #[command(subcommand)]
    pub action: TaskActions,
}

#[derive(Subcommand, Debug)]
pub enum TaskActions {
    /// 入队一个已注册的任务
    Enqueue {
        /// 任务名称，例如 g:collect-shoots
        name: String,
        /// JSON 负载；缺省时入队无负载的元任务
        #[arg(short, long)]
        payload: Option<String>,
        /// 目标队列
        #[arg(short, long)]
        queue: Option<String>,
    },
    /// 查看任务详情
    Inspect {
        /// 任务ID
        id: String,
    },
    /// 列出任务
    List {
        /// 队列过滤
        #[arg(short, long)]
        queue: Option<String>,
        /// 状态过滤：pending、active、scheduled、retry、archived、completed
        #[arg(short, long)]
        state: Option<String>,
    },
    /// 取消尚未执行的任务
    Cancel {
        /// 任务ID
        id: String,
    },
    /// 删除任务
    Delete {
        /// 任务ID
        id: String,
    },
    /// 列出已注册的任务名称
    Names,
}

#[derive(Args, Debug)]
pub struct QueueCommands {
    #[command(subcommand)]
    pub action: QueueActions,
}

#[derive(Subcommand, Debug)]
pub enum QueueActions {
    /// 暂停队列，Worker 不再领取其中的任务
    Pause { queue: String },
    /// 恢复队列
    Resume { queue: String },
    /// 删除队列中所有等待执行的任务
    Drain { queue: String },
}

#[derive(Args, Debug)]
pub struct PeriodicCommands {
    #[command(subcommand)]
    pub action: PeriodicActions,
}

#[derive(Subcommand, Debug)]
pub enum PeriodicActions {
    /// 按调度顺序列出合并后的周期任务
    List,
}

#[derive(Args, Debug)]
pub struct DbCommands {
    #[command(subcommand)]
    pub action: DbActions,
}

#[derive(Subcommand, Debug)]
pub enum DbActions {
    /// 执行内置的数据库迁移
    Migrate,
}

impl Commands {
    /// 是否需要读写其他进程可见的任务队列
    pub fn needs_shared_queue(&self) -> bool {
        match self {
            Commands::Task(cmd) => !matches!(cmd.action, TaskActions::Names),
            Commands::Queue(_) => true,
            _ => false,
        }
    }
}

/// 内存队列只存在于当前进程，运维命令对它的修改在退出时丢失
pub fn ensure_shared_queue(config: &AppConfig, command: &Commands) -> anyhow::Result<()> {
    if command.needs_shared_queue() && config.queue.backend == QueueBackend::Memory {
        anyhow::bail!(
            "task/queue 运维命令需要 postgres 队列后端 (queue.backend = \"postgres\")，当前为 memory"
        );
    }
    Ok(())
}
