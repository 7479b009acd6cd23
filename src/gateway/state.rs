//! Gateway 应用状态

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::upstream::UpstreamClient;

/// Gateway 应用状态
///
/// 启动后只读，所有请求共享。
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let upstream = UpstreamClient::new(config.upstream_endpoint.clone(), config.upstream_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            upstream,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }
}
