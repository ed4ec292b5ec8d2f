//! 页面驱动器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"驱动页面"的能力

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::{Element, Page};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::AppError;

/// DOM 轮询间隔，只打本地浏览器，不打远端服务
const DOM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 页面驱动器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露导航 / 等元素 / 填文件 / 执行 JS 的能力
/// - 不认识 CandidateFile / Ledger
/// - 不处理业务流程
pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    /// 创建新的页面驱动器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 导航到指定 URL
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("导航到: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    /// 当前页面 URL
    pub async fn current_url(&self) -> Result<String> {
        let url = self.page.url().await.map_err(AppError::from)?;
        Ok(url.ok_or_else(|| AppError::Other("页面 URL 不可用".to_string()))?)
    }

    /// 刷新页面
    pub async fn refresh(&self) -> Result<()> {
        self.page.reload().await.map_err(AppError::from)?;
        Ok(())
    }

    /// 查找单个元素，找不到立即返回错误
    pub async fn find(&self, selector: &str) -> Result<Element> {
        Ok(self.page.find_element(selector).await.map_err(AppError::from)?)
    }

    /// 查找所有匹配的元素
    pub async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.page.find_elements(selector).await.map_err(AppError::from)?)
    }

    /// 在限定时间内等待元素出现
    ///
    /// # 参数
    /// - `selector`: CSS 选择器
    /// - `timeout`: 等待上限
    ///
    /// # 返回
    /// 超时返回 `BrowserError::WaitTimeout`
    pub async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(AppError::wait_timeout(selector, timeout.as_secs()).into());
            }
            sleep(DOM_POLL_INTERVAL).await;
        }
    }

    /// 把本地文件路径填入文件输入控件
    ///
    /// 通过 CDP 的 DOM.setFileInputFiles 命令完成，
    /// 等价于往 input[type=file] 里 send_keys 一个路径
    pub async fn set_file_input(&self, element: &Element, file_path: &Path) -> Result<()> {
        debug!("填入文件: {}", file_path.display());
        let mut params =
            SetFileInputFilesParams::new(vec![file_path.to_string_lossy().to_string()]);
        params.backend_node_id = Some(element.backend_node_id.clone());
        self.page.execute(params).await.map_err(AppError::from)?;
        Ok(())
    }

    /// 通过脚本把元素强制改为可见
    ///
    /// 上传控件偶尔不可交互，这是显式的降级路径
    pub async fn force_visible(&self, selector: &str) -> Result<()> {
        let js_code = format!(
            "document.querySelector({}).style.display = 'block'",
            serde_json::to_string(selector)?
        );
        self.eval(js_code).await?;
        Ok(())
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self
            .page
            .evaluate(js_code.into())
            .await
            .map_err(AppError::from)?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }
}
