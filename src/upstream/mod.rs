//! 上游生成式 AI API 客户端
//!
//! 请求体对代理是不透明的：原样序列化后 POST 到固定 endpoint，
//! 密钥以 `?key=` 查询参数注入。上游返回的 JSON 同样原样交回调用方。

mod constants;

use anyhow::Result;
use http::{header, StatusCode};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub use constants::DEFAULT_ENDPOINT;
use constants::{user_agent, API_KEY_PARAM};

use crate::utils::{build_http_client, log_preview};

/// 日志中请求/响应体的最大字符数
const LOG_BODY_MAX_CHARS: usize = 2048;

/// 上游响应（状态码 + JSON 体）
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
}

/// 调用上游失败
///
/// 错误信息中不会包含带密钥的 URL。
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to reach upstream: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("upstream returned a non-JSON body (status {status})")]
    InvalidBody {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

/// 上游客户端，进程内共享
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: String,
}

impl UpstreamClient {
    pub fn new(endpoint: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(&user_agent(), timeout)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 拼接带密钥的上游 URL
    pub fn request_url(&self, api_key: &str) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}={}",
            self.endpoint,
            separator,
            API_KEY_PARAM,
            urlencoding::encode(api_key)
        )
    }

    /// 转发客户端 payload 并解析上游 JSON 响应
    ///
    /// 非 2xx 不视为错误，由调用方按状态码透传。
    pub async fn forward(&self, api_key: &str, payload: &Value) -> Result<UpstreamReply, UpstreamError> {
        let body = payload.to_string();
        tracing::debug!(
            upstream = %self.endpoint,
            body = %log_preview(&body, LOG_BODY_MAX_CHARS),
            "forwarding"
        );

        let response = self
            .client
            .post(self.request_url(api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)
            .map_err(|source| UpstreamError::InvalidBody { status, source })?;

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn request_url_appends_key() {
        let client = UpstreamClient::new("https://example.test/v1:generate", None).unwrap();
        assert_eq!(
            client.request_url("abc"),
            "https://example.test/v1:generate?key=abc"
        );
    }

    #[test]
    fn request_url_encodes_key_and_respects_existing_query() {
        let client = UpstreamClient::new("https://example.test/gen?alt=json", None).unwrap();
        assert_eq!(
            client.request_url("a b&c"),
            "https://example.test/gen?alt=json&key=a%20b%26c"
        );
    }

    #[tokio::test]
    async fn forward_posts_payload_with_key() {
        let server = MockServer::start().await;
        let payload = json!({"contents": [{"parts": [{"text": "hi"}]}]});

        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(query_param("key", "k-123"))
            .and(header_eq("content-type", "application/json"))
            .and(body_json(payload.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = UpstreamClient::new(format!("{}/generate", server.uri()), None).unwrap();
        let reply = client.forward("k-123", &payload).await.unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, json!({"candidates": []}));
    }

    #[tokio::test]
    async fn forward_keeps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {"code": 400}})))
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), None).unwrap();
        let reply = client.forward("k", &json!({})).await.unwrap();

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({"error": {"code": 400}}));
    }

    #[tokio::test]
    async fn forward_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), None).unwrap();
        let err = client.forward("k", &json!({"a": 1})).await.unwrap_err();

        assert!(matches!(
            err,
            UpstreamError::InvalidBody { status, .. } if status == StatusCode::BAD_GATEWAY
        ));
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_key() {
        // 绑定后立即释放端口，连接会被拒绝
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = UpstreamClient::new(endpoint, None).unwrap();
        let err = client.forward("leaky-key", &json!({"a": 1})).await.unwrap_err();

        assert!(matches!(err, UpstreamError::Transport(_)));
        assert!(!format!("{err:?}").contains("leaky-key"));
        assert!(!err.to_string().contains("leaky-key"));
    }

    #[tokio::test]
    async fn forward_times_out_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = UpstreamClient::new(server.uri(), Some(Duration::from_millis(200))).unwrap();
        let err = client.forward("k", &json!({"a": 1})).await.unwrap_err();

        assert!(err.is_timeout());
    }
}
