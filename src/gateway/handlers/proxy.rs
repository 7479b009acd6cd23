//! 代理处理器
//!
//! 校验方法 → 读取密钥 → 解析 JSON → 转发上游 → 透传结果。
//! 每一步失败都直接返回，不做重试。

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
};
use bytes::Bytes;
use serde_json::Value;

use crate::gateway::{error::ProxyError, state::AppState};
use crate::upstream::UpstreamReply;
use crate::utils::log_preview;

const LOG_BODY_MAX_CHARS: usize = 2048;

/// 代理入口，挂载在所有方法上，由处理器自己拒绝非 POST 请求
pub async fn handle_proxy(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let origin = state.config().allowed_origin.header_value();

    match proxy(&state, &method, &body).await {
        Ok(reply) => relay(reply, origin),
        Err(err) => {
            log_failure(&err);
            err.into_response_with_origin(origin)
        }
    }
}

async fn proxy(state: &AppState, method: &Method, body: &[u8]) -> Result<UpstreamReply, ProxyError> {
    if *method != Method::POST {
        return Err(ProxyError::MethodNotAllowed);
    }

    let api_key = state.config().api_key().ok_or(ProxyError::MissingApiKey)?;
    let payload = parse_payload(body)?;

    tracing::info!(bytes = body.len(), "request");
    let reply = state.upstream().forward(api_key, &payload).await?;
    Ok(reply)
}

/// 解析客户端 payload，不检查其结构
fn parse_payload(body: &[u8]) -> Result<Value, ProxyError> {
    // 无请求体视为未发送数据；仅含空白的请求体按 JSON 解析失败处理
    if body.is_empty() {
        return Err(ProxyError::EmptyPayload);
    }

    let payload: Value = serde_json::from_slice(body).map_err(ProxyError::InvalidJson)?;
    if is_falsy(&payload) {
        return Err(ProxyError::EmptyPayload);
    }
    Ok(payload)
}

/// `null`、`false`、数值 0 与空字符串都视为没有数据
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// 按上游状态码构造响应
fn relay(reply: UpstreamReply, origin: HeaderValue) -> Response {
    let body = reply.body.to_string();
    let preview = log_preview(&body, LOG_BODY_MAX_CHARS);

    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);

    if reply.status.is_success() {
        tracing::info!(status = reply.status.as_u16(), "response");
        tracing::debug!(body = %preview, "upstream response body");
        *response.status_mut() = StatusCode::OK;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    } else {
        tracing::error!(status = reply.status.as_u16(), body = %preview, "upstream error");
        *response.status_mut() = reply.status;
    }

    response
}

fn log_failure(err: &ProxyError) {
    match err {
        ProxyError::MethodNotAllowed => tracing::debug!("rejected non-POST request"),
        ProxyError::MissingApiKey => {
            tracing::error!("GEMINI_API_KEY is not configured in the environment")
        }
        ProxyError::InvalidJson(e) => tracing::warn!(error = %e, "failed to parse request body"),
        ProxyError::EmptyPayload => tracing::warn!("request body carried no data"),
        ProxyError::Upstream(e) => tracing::error!(
            error = %e,
            source = ?std::error::Error::source(e).map(|s| s.to_string()),
            timeout = e.is_timeout(),
            "error calling upstream or processing its response"
        ),
    }
}
