//! 运行前探测服务 - 业务能力层
//!
//! 在占用浏览器之前先确认外部条件成立：目标服务可达、
//! （连接模式下）调试端口在听。服务不可达没有本地重试的意义，
//! 立即失败，把重试留给外层的定时调度

use anyhow::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AppError, ServiceError};

/// 探测请求的超时
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// 服务探测器
pub struct ServiceProbe {
    client: Client,
}

impl ServiceProbe {
    /// 创建新的服务探测器
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// 检查目标服务是否可达
    pub async fn check_service(&self, url: &str) -> Result<()> {
        debug!("探测目标服务: {}", url);
        self.client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::service_unreachable(url, e))?;
        info!("✓ 目标服务可达: {}", url);
        Ok(())
    }

    /// 检查浏览器调试端口是否在听
    pub async fn check_devtools(&self, port: u16) -> Result<()> {
        let url = format!("http://localhost:{}/json/version", port);
        debug!("探测浏览器调试端口: {}", url);

        let version: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| devtools_err(port, e))?
            .json()
            .await
            .map_err(|e| devtools_err(port, e))?;

        if let Some(browser) = version.get("Browser").and_then(|v| v.as_str()) {
            info!("✓ 浏览器调试端口可达: {}", browser);
        } else {
            info!("✓ 浏览器调试端口可达 (端口: {})", port);
        }
        Ok(())
    }
}

fn devtools_err(port: u16, e: reqwest::Error) -> AppError {
    AppError::Service(ServiceError::DevtoolsUnreachable {
        port,
        source: Box::new(e),
    })
}
