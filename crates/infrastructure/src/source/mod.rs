//! 分页资源来源的实现

pub mod http;
pub mod static_source;

pub use http::HttpResourceSource;
pub use static_source::StaticResourceSource;
