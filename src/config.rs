//! 应用配置模块
//!
//! 负责从环境变量加载应用配置，包括：
//! - 服务器监听地址和端口
//! - 上游 API 密钥（可缺省，缺省时每个请求返回 500）
//! - 上游 endpoint、CORS 允许的 origin、上游超时
//!
//! 配置在进程启动时构造一次，之后只读。

use anyhow::{Context, Result};
use http::HeaderValue;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

use crate::upstream::DEFAULT_ENDPOINT;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "8888";

/// `Access-Control-Allow-Origin` 的取值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedOrigin {
    /// `*`，允许任意来源
    #[default]
    Any,
    /// 仅允许一个具体的 origin，例如 `https://example.com`
    Exact(HeaderValue),
}

impl AllowedOrigin {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::Any);
        }

        let origin = raw.trim_end_matches('/');
        let rest = origin
            .strip_prefix("https://")
            .or_else(|| origin.strip_prefix("http://"))
            .with_context(|| format!("Allowed origin must be \"*\" or an http(s) origin, got {raw:?}"))?;
        if rest.is_empty() || rest.contains('/') {
            anyhow::bail!("Allowed origin must not contain a path, got {raw:?}");
        }

        let value = HeaderValue::from_str(origin)
            .with_context(|| format!("Allowed origin is not a valid header value: {raw:?}"))?;
        Ok(Self::Exact(value))
    }

    pub fn header_value(&self) -> HeaderValue {
        match self {
            Self::Any => HeaderValue::from_static("*"),
            Self::Exact(value) => value.clone(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 服务器监听地址（如 "0.0.0.0" 或 "127.0.0.1"）
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 上游 API 密钥，注入到 `?key=` 查询参数
    pub api_key: Option<Secret<String>>,
    /// 上游 generateContent endpoint
    pub upstream_endpoint: String,
    pub allowed_origin: AllowedOrigin,
    /// 上游请求超时，`None` 表示一直等待上游返回
    pub upstream_timeout: Option<Duration>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 环境变量
    ///
    /// - `GEMINI_API_KEY`: 上游 API 密钥（缺省时不报错，由请求处理返回 500）
    /// - `GEMINI_PROXY_ENDPOINT`: 上游 endpoint（默认: Gemini `gemini-pro:generateContent`）
    /// - `GEMINI_PROXY_ALLOWED_ORIGIN`: CORS origin（默认: `*`）
    /// - `GEMINI_PROXY_UPSTREAM_TIMEOUT_SECS`: 上游超时秒数（默认: 不设超时）
    /// - `GEMINI_PROXY_HOST`: 服务器监听地址（默认: "0.0.0.0"）
    /// - `GEMINI_PROXY_PORT`: 服务器监听端口（默认: 8888）
    ///
    /// # 错误
    ///
    /// - 如果 `GEMINI_PROXY_PORT` 不是有效的端口号
    /// - 如果 `GEMINI_PROXY_ALLOWED_ORIGIN` 既不是 `*` 也不是合法 origin
    /// - 如果 `GEMINI_PROXY_UPSTREAM_TIMEOUT_SECS` 不是正整数
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 通过任意查找函数加载配置，便于测试时不修改进程环境
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("GEMINI_PROXY_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = lookup("GEMINI_PROXY_PORT")
            .unwrap_or_else(|| DEFAULT_PORT.to_string())
            .parse()
            .context("GEMINI_PROXY_PORT must be a valid port number")?;

        // 空字符串与未设置同等对待
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .map(Secret::new);

        let upstream_endpoint = lookup("GEMINI_PROXY_ENDPOINT")
            .filter(|endpoint| !endpoint.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let allowed_origin = match lookup("GEMINI_PROXY_ALLOWED_ORIGIN") {
            Some(raw) => AllowedOrigin::parse(&raw)?,
            None => AllowedOrigin::default(),
        };

        let upstream_timeout = match lookup("GEMINI_PROXY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .context("GEMINI_PROXY_UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;
                if secs == 0 {
                    anyhow::bail!("GEMINI_PROXY_UPSTREAM_TIMEOUT_SECS must be greater than zero");
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            api_key,
            upstream_endpoint,
            allowed_origin,
            upstream_timeout,
        })
    }

    /// 取出 API 密钥明文，仅用于构造上游 URL
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }
}
