//! HTTP 请求处理器

pub mod health;
pub mod proxy;

pub use health::handle_health;
pub use proxy::handle_proxy;
