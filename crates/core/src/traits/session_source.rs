use async_trait::async_trait;

use crate::{models::Session, InventoryError, InventoryResult};

/// 会话来源：文件、secret store 或身份令牌交换
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// 完整认证，签发新会话
    async fn issue(&self, name: &str) -> InventoryResult<Session>;

    /// 续期已有会话；不支持续期的来源返回错误，调用方改为重新认证
    async fn renew(&self, session: &Session) -> InventoryResult<Session> {
        Err(InventoryError::Credential(format!(
            "会话 {} 不支持续期",
            session.name
        )))
    }
}
