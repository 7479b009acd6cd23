//! 上游 Gemini API 常量

/// 默认上游 endpoint，可通过 `GEMINI_PROXY_ENDPOINT` 覆盖
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// 注入密钥使用的查询参数名
pub const API_KEY_PARAM: &str = "key";

pub fn user_agent() -> String {
    format!("gemini-proxy/{}", env!("CARGO_PKG_VERSION"))
}
