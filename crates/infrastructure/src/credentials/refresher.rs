use std::sync::Arc;
use std::time::Duration;

use inventory_core::models::Session;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::cache::SessionCache;

/// 两次刷新之间的最短间隔，防止 TTL 极短时空转
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// 单个会话的后台刷新循环
///
/// 每次成功刷新后按新会话的 TTL × `refresh_fraction` 重新计算下一次刷新时间；
/// 刷新失败保留旧会话，并在 `retry_interval` 后重试。
pub struct SessionRefresher {
    cache: Arc<SessionCache>,
    name: String,
    refresh_fraction: f64,
    retry_interval: Duration,
}

impl SessionRefresher {
    pub fn new(
        cache: Arc<SessionCache>,
        name: impl Into<String>,
        refresh_fraction: f64,
        retry_interval: Duration,
    ) -> Self {
        Self {
            cache,
            name: name.into(),
            refresh_fraction,
            retry_interval,
        }
    }

    fn next_delay(&self, session: &Session) -> Duration {
        session
            .ttl()
            .mul_f64(self.refresh_fraction)
            .max(MIN_REFRESH_INTERVAL)
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut delay = match self.cache.resolve(&self.name).await {
            Ok(session) => self.next_delay(&session),
            Err(e) => {
                warn!(session.name = %self.name, error = %e, "会话初始化失败，稍后重试");
                self.retry_interval
            }
        };
        info!(session.name = %self.name, next_refresh_secs = delay.as_secs(), "会话后台刷新已启动");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(session.name = %self.name, "会话后台刷新已停止");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            delay = match self.cache.refresh(&self.name).await {
                Ok(session) => self.next_delay(&session),
                Err(e) => {
                    warn!(session.name = %self.name, error = %e, "会话刷新失败，保留旧会话");
                    self.retry_interval
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use inventory_core::{
        models::SessionHandle, traits::SessionSource, Clock, InventoryError, InventoryResult,
        ManualClock,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// 首次签发 TTL 100s，之后每次续期 TTL 50s
    struct LeaseSource {
        clock: Arc<ManualClock>,
        issued: AtomicUsize,
        renewed: AtomicUsize,
        fail_renew: AtomicBool,
    }

    #[async_trait]
    impl SessionSource for LeaseSource {
        async fn issue(&self, name: &str) -> InventoryResult<Session> {
            self.issued.fetch_add(1, Ordering::SeqCst);
            let now = self.clock.now();
            Ok(Session {
                name: name.to_string(),
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(100),
                renewable: true,
                handle: SessionHandle::Bearer("issued".into()),
            })
        }

        async fn renew(&self, session: &Session) -> InventoryResult<Session> {
            if self.fail_renew.load(Ordering::SeqCst) {
                return Err(InventoryError::Network("renew failed".into()));
            }
            self.renewed.fetch_add(1, Ordering::SeqCst);
            let now = self.clock.now();
            Ok(Session {
                issued_at: now,
                expires_at: now + chrono::Duration::seconds(50),
                handle: SessionHandle::Bearer("renewed".into()),
                ..session.clone()
            })
        }
    }

    fn setup() -> (Arc<LeaseSource>, Arc<SessionCache>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let source = Arc::new(LeaseSource {
            clock: clock.clone(),
            issued: AtomicUsize::new(0),
            renewed: AtomicUsize::new(0),
            fail_renew: AtomicBool::new(false),
        });
        let cache = Arc::new(SessionCache::new(clock, chrono::Duration::seconds(10)));
        cache.register_source("vault", source.clone()).unwrap();
        (source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_interval_follows_new_ttl() {
        let (source, cache) = setup();
        let cancel = CancellationToken::new();
        let handle = SessionRefresher::new(cache.clone(), "vault", 0.8, Duration::from_secs(5))
            .spawn(cancel.clone());

        // 首次签发后 80s 续期
        tokio::time::sleep(Duration::from_secs(79)).await;
        assert_eq!(source.issued.load(Ordering::SeqCst), 1);
        assert_eq!(source.renewed.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.renewed.load(Ordering::SeqCst), 1);

        // 续期后 TTL 50s，下次在 40s 后
        tokio::time::sleep(Duration::from_secs(38)).await;
        assert_eq!(source.renewed.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.renewed.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_failure_falls_back_to_reauthentication() {
        let (source, cache) = setup();
        source.fail_renew.store(true, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let handle = SessionRefresher::new(cache.clone(), "vault", 0.8, Duration::from_secs(5))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(81)).await;
        assert_eq!(source.issued.load(Ordering::SeqCst), 2);
        assert_eq!(source.renewed.load(Ordering::SeqCst), 0);
        assert_eq!(
            cache.cached("vault").map(|s| s.handle),
            Some(SessionHandle::Bearer("issued".into()))
        );

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_exits_on_cancel() {
        let (_source, cache) = setup();
        let cancel = CancellationToken::new();
        let handle = SessionRefresher::new(cache, "vault", 0.8, Duration::from_secs(5))
            .spawn(cancel.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        handle.await.unwrap();
    }
}
