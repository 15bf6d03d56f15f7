use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    config::{SessionConfig, SessionKind},
    models::{Session, SessionHandle},
    traits::SessionSource,
    Clock, InventoryError, InventoryResult,
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::expiry::{certificate_not_after, jwt_expiry, jwt_issued_at};

async fn read_file(path: &Path) -> InventoryResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| InventoryError::Credential(format!("读取凭据文件 {} 失败: {e}", path.display())))
}

/// 文件中的凭据：JWT 令牌或客户端证书+私钥
///
/// 文件由外部进程轮换，每次签发都重新读取；这类会话不可续期。
pub struct FileSessionSource {
    token_path: Option<PathBuf>,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl FileSessionSource {
    pub fn token(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            token_path: Some(path.into()),
            cert_path: None,
            key_path: None,
            clock,
        }
    }

    pub fn certificate(
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_path: None,
            cert_path: Some(cert_path.into()),
            key_path: Some(key_path.into()),
            clock,
        }
    }
}

#[async_trait]
impl SessionSource for FileSessionSource {
    async fn issue(&self, name: &str) -> InventoryResult<Session> {
        let now = self.clock.now();

        if let Some(path) = &self.token_path {
            let token = read_file(path).await?.trim().to_string();
            let expires_at = jwt_expiry(&token).unwrap_or_else(|| {
                warn!(session.name = name, "无法解析令牌的过期时间，按已过期处理");
                DateTime::UNIX_EPOCH
            });
            return Ok(Session {
                name: name.to_string(),
                issued_at: jwt_issued_at(&token).unwrap_or(now),
                expires_at,
                renewable: false,
                handle: SessionHandle::Bearer(token),
            });
        }

        let (Some(cert_path), Some(key_path)) = (&self.cert_path, &self.key_path) else {
            return Err(InventoryError::config_error(format!(
                "会话 {name} 既没有令牌文件也没有证书文件"
            )));
        };
        let cert_pem = read_file(cert_path).await?;
        let key_pem = read_file(key_path).await?;
        let expires_at = certificate_not_after(cert_pem.as_bytes()).unwrap_or_else(|e| {
            warn!(session.name = name, error = %e, "无法解析证书的过期时间，按已过期处理");
            DateTime::UNIX_EPOCH
        });

        Ok(Session {
            name: name.to_string(),
            issued_at: now,
            expires_at,
            renewable: false,
            handle: SessionHandle::Certificate { cert_pem, key_pem },
        })
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: AuthBody,
}

#[derive(Debug, Deserialize)]
struct AuthBody {
    client_token: String,
    lease_duration: i64,
    #[serde(default)]
    renewable: bool,
}

/// 租约到期时间；负数按立即到期处理，超出时间范围视为无效响应
fn lease_expiry(name: &str, now: DateTime<Utc>, lease_seconds: i64) -> InventoryResult<DateTime<Utc>> {
    chrono::Duration::try_seconds(lease_seconds.max(0))
        .and_then(|lease| now.checked_add_signed(lease))
        .ok_or_else(|| {
            InventoryError::Credential(format!("会话 {name} 的租约时长超出范围: {lease_seconds}"))
        })
}

/// 用身份令牌向 secret store 换取租约制客户端令牌
pub struct TokenExchangeSource {
    client: reqwest::Client,
    address: String,
    mount: String,
    role: String,
    identity_token_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl TokenExchangeSource {
    pub fn new(
        address: impl Into<String>,
        mount: impl Into<String>,
        role: impl Into<String>,
        identity_token_path: impl Into<PathBuf>,
        request_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> InventoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| InventoryError::Network(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self {
            client,
            address: address.into().trim_end_matches('/').to_string(),
            mount: mount.into(),
            role: role.into(),
            identity_token_path: identity_token_path.into(),
            clock,
        })
    }

    async fn parse_auth(&self, name: &str, response: reqwest::Response) -> InventoryResult<Session> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InventoryError::Credential(format!(
                "会话 {name} 认证失败: HTTP {status}: {body}"
            )));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| InventoryError::Credential(format!("会话 {name} 认证响应无效: {e}")))?;

        let now = self.clock.now();
        Ok(Session {
            name: name.to_string(),
            issued_at: now,
            expires_at: lease_expiry(name, now, body.auth.lease_duration)?,
            renewable: body.auth.renewable,
            handle: SessionHandle::Bearer(body.auth.client_token),
        })
    }
}

#[async_trait]
impl SessionSource for TokenExchangeSource {
    async fn issue(&self, name: &str) -> InventoryResult<Session> {
        let jwt = read_file(&self.identity_token_path).await?;
        let url = format!("{}/v1/auth/{}/login", self.address, self.mount);
        debug!(session.name = name, url = %url, "使用身份令牌登录");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "role": self.role, "jwt": jwt.trim() }))
            .send()
            .await
            .map_err(|e| InventoryError::Network(format!("会话 {name} 登录请求失败: {e}")))?;

        self.parse_auth(name, response).await
    }

    async fn renew(&self, session: &Session) -> InventoryResult<Session> {
        let SessionHandle::Bearer(token) = &session.handle else {
            return Err(InventoryError::Credential(format!(
                "会话 {} 不是令牌会话，无法续期",
                session.name
            )));
        };
        let url = format!("{}/v1/auth/token/renew-self", self.address);

        let response = self
            .client
            .post(&url)
            .header("X-Vault-Token", token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                InventoryError::Network(format!("会话 {} 续期请求失败: {e}", session.name))
            })?;

        self.parse_auth(&session.name, response).await
    }
}

/// 按配置构造会话来源
pub fn source_from_config(
    config: &SessionConfig,
    request_timeout: Duration,
    clock: Arc<dyn Clock>,
) -> InventoryResult<Arc<dyn SessionSource>> {
    let missing = |field: &str| {
        InventoryError::config_error(format!("会话 {} 缺少 {field}", config.name))
    };

    match config.kind {
        SessionKind::File => match (&config.token_path, &config.cert_path, &config.key_path) {
            (Some(token), _, _) => Ok(Arc::new(FileSessionSource::token(token, clock))),
            (None, Some(cert), Some(key)) => {
                Ok(Arc::new(FileSessionSource::certificate(cert, key, clock)))
            }
            _ => Err(missing("token_path 或 cert_path/key_path")),
        },
        SessionKind::TokenExchange => {
            let address = config.address.as_deref().ok_or_else(|| missing("address"))?;
            let role = config.role.as_deref().ok_or_else(|| missing("role"))?;
            let identity = config
                .identity_token_path
                .as_deref()
                .ok_or_else(|| missing("identity_token_path"))?;
            Ok(Arc::new(TokenExchangeSource::new(
                address,
                config.mount.as_str(),
                role,
                identity,
                request_timeout,
                clock,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::expiry::fake_jwt;
    use inventory_core::SystemClock;
    use serde_json::json;

    #[tokio::test]
    async fn test_file_token_session_uses_jwt_exp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        let token = fake_jwt(&json!({"exp": 4_000_000_000_i64}));
        std::fs::write(&path, format!("{token}\n")).unwrap();

        let source = FileSessionSource::token(&path, Arc::new(SystemClock));
        let session = source.issue("garden").await.unwrap();
        assert_eq!(session.expires_at.timestamp(), 4_000_000_000);
        assert!(!session.renewable);
        assert_eq!(session.handle, SessionHandle::Bearer(token));
    }

    #[tokio::test]
    async fn test_unparseable_token_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "opaque-token").unwrap();

        let source = FileSessionSource::token(&path, Arc::new(SystemClock));
        let session = source.issue("garden").await.unwrap();
        assert_eq!(session.expires_at, DateTime::UNIX_EPOCH);
        assert!(!session.is_usable(Utc::now(), chrono::Duration::zero()));
    }

    #[tokio::test]
    async fn test_missing_file_is_credential_error() {
        let source = FileSessionSource::token("/nonexistent/token", Arc::new(SystemClock));
        let err = source.issue("garden").await.unwrap_err();
        assert!(matches!(err, InventoryError::Credential(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_lease_expiry_bounds() {
        let now = Utc::now();
        assert_eq!(
            lease_expiry("vault", now, 3600).unwrap(),
            now + chrono::Duration::hours(1)
        );
        assert_eq!(lease_expiry("vault", now, -5).unwrap(), now);
        assert!(matches!(
            lease_expiry("vault", now, i64::MAX),
            Err(InventoryError::Credential(_))
        ));
        assert!(lease_expiry("vault", now, 9_000_000_000_000).is_err());
    }

    #[tokio::test]
    async fn test_file_source_cannot_renew() {
        let source = FileSessionSource::token("/nonexistent/token", Arc::new(SystemClock));
        let session = Session {
            name: "garden".into(),
            issued_at: Utc::now(),
            expires_at: Utc::now(),
            renewable: false,
            handle: SessionHandle::Bearer("t".into()),
        };
        assert!(source.renew(&session).await.is_err());
    }
}
