use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "安装Ctrl+C信号处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "安装SIGTERM信号处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}

/// 根取消令牌，收到 SIGINT/SIGTERM 时取消
///
/// 各组件持有它的子令牌；令牌被其他途径取消时监听任务随之退出。
pub fn install_shutdown_handler() -> CancellationToken {
    let root = CancellationToken::new();
    let token = root.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_shutdown_signal() => {
                info!("开始优雅关闭");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_exits_when_token_cancelled_elsewhere() {
        let token = install_shutdown_handler();
        let child = token.child_token();
        token.cancel();
        child.cancelled().await;
        assert!(child.is_cancelled());
    }
}
