use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

/// 外部签发的会话凭据，只存在于进程内存中
#[derive(Clone, PartialEq, Eq)]
pub enum SessionHandle {
    /// Bearer令牌（JWT 或 secret store 客户端令牌）
    Bearer(String),
    /// 客户端证书及私钥（PEM）
    Certificate { cert_pem: String, key_pem: String },
}

impl SessionHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionHandle::Bearer(_) => "bearer",
            SessionHandle::Certificate { .. } => "certificate",
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 不输出凭据内容
        write!(f, "SessionHandle::{}(..)", self.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub renewable: bool,
    pub handle: SessionHandle,
}

impl Session {
    /// 仅当 now < expires_at - margin 时会话可用
    pub fn is_usable(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        now < self.expires_at - safety_margin
    }

    /// 签发时的有效期长度
    pub fn ttl(&self) -> StdDuration {
        (self.expires_at - self.issued_at)
            .to_std()
            .unwrap_or(StdDuration::ZERO)
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> StdDuration {
        (self.expires_at - now).to_std().unwrap_or(StdDuration::ZERO)
    }
}
