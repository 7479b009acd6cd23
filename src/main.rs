//! gemini-proxy - 生成式 AI API 透传代理
//!
//! 把客户端的 JSON 请求原样转发给 Gemini API，在服务端注入 API 密钥，
//! 再把上游响应（或错误）连同 CORS 头交回调用方。
//!
//! # 命令行接口
//!
//! - `serve`: 启动代理服务器
//! - `test`: 向本地服务器发送测试请求

mod commands;
mod config;
mod gateway;
mod upstream;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// gemini-proxy CLI
#[derive(Parser)]
#[command(name = "gemini-proxy")]
#[command(about = "Pass-through proxy for the Gemini API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// 可用的命令
#[derive(Subcommand)]
enum Commands {
    /// 启动代理服务器
    Serve,
    /// 向本地服务器发送测试请求
    Test {
        /// 发送给模型的文本
        #[arg(short, long, default_value = "Hello, Gemini!")]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    if let Ok(dotenv_path) = std::env::var("GEMINI_PROXY_ENV_FILE") {
        dotenvy::from_path(&dotenv_path).ok();
    } else {
        dotenvy::dotenv().ok();
    }

    // 初始化日志系统
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_proxy=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve => commands::serve_command(config).await,
        Commands::Test { prompt } => commands::test_command(config, prompt).await,
    }
}
