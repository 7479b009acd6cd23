//! 代理请求错误
//!
//! 每个变体对应一种终止响应。上游非 2xx 不在此列，按原状态码透传。

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::upstream::UpstreamError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("upstream API key is not configured")]
    MissingApiKey,
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("request body is empty")]
    EmptyPayload,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// 返回给调用方的错误体
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidJson(_) | Self::EmptyPayload => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对外暴露的错误信息；上游故障的细节只写日志
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "Method Not Allowed. Please use POST.",
            Self::MissingApiKey => "API key not configured.",
            Self::InvalidJson(_) => "Bad Request: Could not parse JSON body.",
            Self::EmptyPayload => "Bad Request: No data sent.",
            Self::Upstream(_) => "Internal Server Error in proxy function",
        }
    }

    /// 渲染为 HTTP 响应
    ///
    /// 只有发起过上游调用的失败才带 CORS 头。
    pub fn into_response_with_origin(self, origin: HeaderValue) -> Response {
        let status = self.status();
        let mut response = (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response();

        let headers = response.headers_mut();
        match self {
            Self::MethodNotAllowed => {
                headers.insert(header::ALLOW, HeaderValue::from_static("POST"));
            }
            Self::Upstream(_) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let response =
            ProxyError::MethodNotAllowed.into_response_with_origin(HeaderValue::from_static("*"));

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[test]
    fn client_errors_map_to_bad_request() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert_eq!(
            ProxyError::InvalidJson(parse_err).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ProxyError::EmptyPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::MissingApiKey.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
