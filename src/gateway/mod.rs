//! Gateway 应用层
//!
//! HTTP 服务器和请求处理

mod error;
mod handlers;
mod middleware;
mod state;

pub use state::AppState;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// 代理路由
pub const PROXY_PATH: &str = "/gemini-proxy";
/// 与 Netlify Functions 相同的路径，前端无需改动即可切换过来
pub const NETLIFY_PROXY_PATH: &str = "/.netlify/functions/gemini-proxy";

pub async fn serve(config: Config) -> Result<()> {
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every proxy request will answer 500");
    }
    match config.upstream_timeout {
        Some(timeout) => tracing::info!("Upstream timeout: {}s", timeout.as_secs()),
        None => tracing::info!("No upstream timeout configured; requests wait for the upstream"),
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = AppState::new(config)?;
    tracing::info!("Forwarding to {}", state.upstream().endpoint());

    let app = build_router(state);
    tracing::info!("Starting server on http://{}{}", addr, PROXY_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

pub(crate) fn build_router(state: AppState) -> Router {
    // 代理路由接受所有方法，由处理器返回 405 与 Allow 头
    let proxy_routes = Router::new()
        .route(PROXY_PATH, any(handlers::handle_proxy))
        .route(NETLIFY_PROXY_PATH, any(handlers::handle_proxy))
        .layer(DefaultBodyLimit::disable());
    let public_routes = Router::new().route("/health", get(handlers::handle_health));

    Router::new()
        .merge(proxy_routes)
        .merge(public_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn(middleware::request_logger))
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = ctrl_c => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_serves_known_routes_only() {
        let config = Config::from_lookup(|_| None).unwrap();
        let app = build_router(AppState::new(config).unwrap());

        let health = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let unknown = app
            .oneshot(Request::builder().uri("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    }
}
