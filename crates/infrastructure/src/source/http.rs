use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    models::{Session, SessionHandle},
    traits::{Page, ResourceSource, Scope},
    InventoryError, InventoryResult, Registry,
};
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::credentials::SessionCache;

/// 按证书会话构造的客户端，附带构造时会话的过期时间用于判断是否需要替换
#[derive(Clone)]
struct IdentityClient {
    expires_at: DateTime<Utc>,
    client: reqwest::Client,
}

/// 基于 HTTP 的分页列举
///
/// 请求形如 `GET {base_url}/{kind}?{scope参数}&page_token=…`，响应体即 [`Page`]。
/// 每个请求都先通过 [`SessionCache`] 取得会话：令牌会话加 `Authorization: Bearer`，
/// 证书会话使用带客户端身份的专用 client，会话更换后替换该 client。
/// 401/403 时丢弃被拒绝的会话，重试时会重新签发。
pub struct HttpResourceSource {
    base_url: String,
    sessions: Arc<SessionCache>,
    /// scope.provider -> 会话名称
    bindings: Registry<String, String>,
    default_session: Option<String>,
    client: reqwest::Client,
    identity_clients: Registry<String, IdentityClient>,
    timeout: Duration,
}

impl HttpResourceSource {
    pub fn new(
        base_url: impl Into<String>,
        sessions: Arc<SessionCache>,
        timeout: Duration,
    ) -> InventoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::Network(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sessions,
            bindings: Registry::new(),
            default_session: None,
            client,
            identity_clients: Registry::new(),
            timeout,
        })
    }

    pub fn with_default_session(mut self, session: impl Into<String>) -> Self {
        self.default_session = Some(session.into());
        self
    }

    /// 为某个采集范围指定会话；同一范围重复绑定是配置错误
    pub fn bind(
        &self,
        provider: impl Into<String>,
        session: impl Into<String>,
    ) -> InventoryResult<()> {
        self.bindings.register(provider.into(), session.into())?;
        Ok(())
    }

    fn session_name(&self, scope: &Scope) -> InventoryResult<String> {
        self.bindings
            .get(&scope.provider)
            .or_else(|| self.default_session.clone())
            .ok_or_else(|| {
                InventoryError::config_error(format!("采集范围 {} 没有配置凭据", scope.provider))
            })
    }

    fn identity_client(
        &self,
        session: &Session,
        cert_pem: &str,
        key_pem: &str,
    ) -> InventoryResult<reqwest::Client> {
        if let Some(cached) = self.identity_clients.get(&session.name) {
            if cached.expires_at == session.expires_at {
                return Ok(cached.client);
            }
        }

        let mut pem = cert_pem.as_bytes().to_vec();
        pem.push(b'\n');
        pem.extend_from_slice(key_pem.as_bytes());
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| InventoryError::Credential(format!("会话 {} 证书无效: {e}", session.name)))?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .identity(identity)
            .build()
            .map_err(|e| InventoryError::Network(format!("创建HTTP客户端失败: {e}")))?;

        debug!(session.name = %session.name, "会话已更换，替换客户端证书");
        self.identity_clients.overwrite(
            session.name.clone(),
            IdentityClient {
                expires_at: session.expires_at,
                client: client.clone(),
            },
        );
        Ok(client)
    }

    fn url(&self, kind: &str) -> String {
        format!("{}/{}", self.base_url, kind)
    }
}

/// HTTP 状态码到错误分类的映射
fn classify_status(status: StatusCode, kind: &str, body: &str) -> InventoryError {
    let message = format!("列举 {kind} 失败: HTTP {status}: {body}");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InventoryError::Credential(message),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            InventoryError::UnsupportedValue(message).skip_retry()
        }
        _ => InventoryError::Network(message),
    }
}

#[async_trait]
impl ResourceSource for HttpResourceSource {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn fetch_page(
        &self,
        kind: &str,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> InventoryResult<Page> {
        let session = self.sessions.resolve(&self.session_name(scope)?).await?;

        let request = match &session.handle {
            SessionHandle::Bearer(token) => self.client.get(self.url(kind)).bearer_auth(token),
            SessionHandle::Certificate { cert_pem, key_pem } => self
                .identity_client(&session, cert_pem, key_pem)?
                .get(self.url(kind)),
        };

        let mut query = scope.params.clone();
        if let Some(token) = page_token {
            query.push(("page_token".to_string(), token.to_string()));
        }

        let response = request.query(&query).send().await.map_err(|e| {
            if e.is_timeout() {
                InventoryError::Timeout(format!("列举 {kind} 超时: {e}"))
            } else {
                InventoryError::Network(format!("列举 {kind} 请求失败: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                self.sessions.invalidate(&session).await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, kind, &body));
        }

        response
            .json::<Page>()
            .await
            .map_err(|e| InventoryError::Network(format!("解析 {kind} 响应失败: {e}")))
    }
}
