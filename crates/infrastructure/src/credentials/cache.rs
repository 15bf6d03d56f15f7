use std::sync::Arc;

use chrono::Duration;
use inventory_core::{
    models::Session, traits::SessionSource, Clock, InventoryError, InventoryResult, Registry,
    RegistryError,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::observability::{metrics_collector::record_session_refresh, StructuredLogger};

pub const DEFAULT_SAFETY_MARGIN_SECONDS: i64 = 60;

/// 按名称缓存会话
///
/// `resolve` 只返回距离过期至少还有安全余量的会话，否则在该名称的锁内刷新。
/// 同一名称的刷新是串行的：并发调用者等待正在进行的刷新，而不会再触发一次。
/// 刷新失败时保留旧会话，调用方收到瞬时错误。
pub struct SessionCache {
    sources: Registry<String, Arc<dyn SessionSource>>,
    sessions: Registry<String, Session>,
    locks: Registry<String, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
}

impl SessionCache {
    pub fn new(clock: Arc<dyn Clock>, safety_margin: Duration) -> Self {
        Self {
            sources: Registry::new(),
            sessions: Registry::new(),
            locks: Registry::new(),
            clock,
            safety_margin,
        }
    }

    pub fn register_source(
        &self,
        name: impl Into<String>,
        source: Arc<dyn SessionSource>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        self.sources.register(name.clone(), source)?;
        self.locks.overwrite(name, Arc::new(Mutex::new(())));
        Ok(())
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names = self.sources.keys();
        names.sort();
        names
    }

    pub fn cached(&self, name: &str) -> Option<Session> {
        self.sessions.get(name)
    }

    fn usable(&self, session: &Session) -> bool {
        session.is_usable(self.clock.now(), self.safety_margin)
    }

    fn lock_for(&self, name: &str) -> InventoryResult<Arc<Mutex<()>>> {
        self.locks
            .get(name)
            .ok_or_else(|| InventoryError::session_unavailable(name))
    }

    /// 返回当前可用的会话，必要时刷新
    pub async fn resolve(&self, name: &str) -> InventoryResult<Session> {
        if let Some(session) = self.sessions.get(name) {
            if self.usable(&session) {
                return Ok(session);
            }
        }

        let lock = self.lock_for(name)?;
        let _guard = lock.lock().await;

        // 等锁期间其他调用者可能已经完成刷新
        let current = self.sessions.get(name);
        if let Some(session) = &current {
            if self.usable(session) {
                debug!(session.name = name, "使用并发刷新得到的会话");
                return Ok(session.clone());
            }
        }

        self.refresh_locked(name, current).await
    }

    /// 无条件刷新：可续期的会话先尝试续期，续期失败或不可续期时重新认证
    pub async fn refresh(&self, name: &str) -> InventoryResult<Session> {
        let lock = self.lock_for(name)?;
        let _guard = lock.lock().await;
        let current = self.sessions.get(name);
        self.refresh_locked(name, current).await
    }

    /// 服务端拒绝了会话：仍是缓存中的同一个会话时丢弃它，下一次 `resolve` 重新签发
    pub async fn invalidate(&self, rejected: &Session) {
        let Ok(lock) = self.lock_for(&rejected.name) else {
            return;
        };
        let _guard = lock.lock().await;
        if self.sessions.get(&rejected.name).as_ref() == Some(rejected) {
            self.sessions.unregister(&rejected.name);
            warn!(session.name = %rejected.name, "会话被服务端拒绝，已丢弃");
        }
    }

    async fn refresh_locked(
        &self,
        name: &str,
        current: Option<Session>,
    ) -> InventoryResult<Session> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| InventoryError::session_unavailable(name))?;

        let (result, method) = match &current {
            Some(session) if session.renewable => match source.renew(session).await {
                Ok(renewed) if self.usable(&renewed) => (Ok(renewed), "renew"),
                Ok(renewed) => {
                    // 租约已达上限，续期只会得到更短的会话
                    warn!(
                        session.name = name,
                        session.expires_at = %renewed.expires_at,
                        "续期后的会话仍在安全余量内，重新认证"
                    );
                    (source.issue(name).await, "issue")
                }
                Err(e) => {
                    warn!(session.name = name, error = %e, "会话续期失败，重新认证");
                    (source.issue(name).await, "issue")
                }
            },
            _ => (source.issue(name).await, "issue"),
        };

        match result {
            Ok(session) if self.usable(&session) => {
                self.sessions.overwrite(name.to_string(), session.clone());
                record_session_refresh(name, true);
                StructuredLogger::log_session_refreshed(name, method, session.expires_at);
                Ok(session)
            }
            Ok(session) => {
                record_session_refresh(name, false);
                warn!(
                    session.name = name,
                    session.expires_at = %session.expires_at,
                    stale_retained = current.is_some(),
                    "新签发的会话已过期或即将过期"
                );
                Err(InventoryError::Credential(format!(
                    "会话 {name} 刷新后仍不可用，过期时间 {}",
                    session.expires_at
                )))
            }
            Err(e) => {
                record_session_refresh(name, false);
                warn!(
                    session.name = name,
                    error = %e,
                    stale_retained = current.is_some(),
                    "会话刷新失败"
                );
                Err(InventoryError::Credential(format!("会话 {name} 刷新失败: {e}")))
            }
        }
    }
}
