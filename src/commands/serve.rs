//! Serve 命令 - 启动代理服务器

use anyhow::Result;

use crate::config::Config;
use crate::gateway;

/// 执行服务器启动命令
///
/// 监听 `GEMINI_PROXY_HOST:GEMINI_PROXY_PORT`，收到 Ctrl+C 或 SIGTERM 后优雅关闭。
pub async fn serve_command(config: Config) -> Result<()> {
    gateway::serve(config).await
}
