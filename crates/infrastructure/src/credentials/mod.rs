//! 会话凭据缓存
//!
//! 所有外部系统的认证都经过 [`SessionCache`]：调用方按名称获取一个当前有效的会话，
//! 不需要关心过期和刷新。

pub mod cache;
pub mod expiry;
pub mod refresher;
pub mod sources;

pub use cache::{SessionCache, DEFAULT_SAFETY_MARGIN_SECONDS};
pub use expiry::{certificate_not_after, jwt_expiry};
pub use refresher::SessionRefresher;
pub use sources::{source_from_config, FileSessionSource, TokenExchangeSource};
