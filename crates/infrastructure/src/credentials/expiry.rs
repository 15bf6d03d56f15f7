//! 从凭据内容中解析过期时间
//!
//! 无法解析的凭据一律视为已过期。

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use inventory_core::{InventoryError, InventoryResult};

/// 读取未校验的 JWT 负载中的 `exp` 声明
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    jwt_claim(token, "exp")
}

/// 读取 JWT 的 `iat` 声明
pub fn jwt_issued_at(token: &str) -> Option<DateTime<Utc>> {
    jwt_claim(token, "iat")
}

fn jwt_claim(token: &str, claim: &str) -> Option<DateTime<Utc>> {
    let payload = token.trim().split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let value = claims.get(claim)?;
    let seconds = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::from_timestamp(seconds, 0)
}

/// 读取 PEM 证书的 notAfter
pub fn certificate_not_after(pem: &[u8]) -> InventoryResult<DateTime<Utc>> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem)
        .map_err(|e| InventoryError::Credential(format!("证书PEM解析失败: {e}")))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| InventoryError::Credential(format!("X.509证书解析失败: {e}")))?;
    let timestamp = cert.validity().not_after.timestamp();
    DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| InventoryError::Credential(format!("证书过期时间超出范围: {timestamp}")))
}

#[cfg(test)]
pub(crate) fn fake_jwt(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
