//! 链接捕获服务 - 业务能力层
//!
//! 只负责从页面上等出分享链接、上传进度和下载确认，不关心流程
//!
//! 页面是异步的，元素引用随时可能被替换。这里的原则：
//! - 所有等待都有上限，绝不无限阻塞
//! - 元素失效是预期状况，在重试预算内吸收
//! - 预算耗尽时报告明确的结局（LinkUnavailable / ProgressTimeout / ...），
//!   而不是底层错误

use anyhow::Result;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, CaptureError};
use crate::infrastructure::PageDriver;
use crate::utils::{PollPolicy, RetryPolicy};

/// 分享链接的锚元素
const SHARED_LINK_SELECTOR: &str = "p.lead a[rel='nofollow']";
/// 上传进度条
const PROGRESS_BAR_SELECTOR: &str = ".progress-bar";
/// 下载确认按钮（打包就绪的标志）
const CONFIRM_SELECTOR: &str = "a[data-bs-target='#modalArchive']";
/// 链接信号的本地探测间隔，只查 DOM 和 URL，不打远端
const LINK_SIGNAL_INTERVAL: Duration = Duration::from_secs(1);

/// 链接出现的两种确认信号
///
/// 两个来源变体：一个等 URL 跳转后重新读页面，一个直接轮询
/// 链接锚元素。统一实现里两种信号赛跑，谁先到用谁
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkSignal {
    /// 页面跳转走了（跳转变体）
    Redirected,
    /// 链接锚元素直接出现（锚元素变体）
    AnchorPresent,
}

/// 链接捕获服务
pub struct LinkCapture {
    /// 两种链接信号共享的总时间窗口
    link_envelope: Duration,
    /// 跳转后等新页面基础 DOM 的上限
    page_load_timeout: Duration,
    confirm_timeout: Duration,
    progress_timeout: Duration,
    /// 远端轮询间隔下限
    poll_interval: Duration,
    /// 元素失效的重试策略
    stale_retry: RetryPolicy,
    verbose_logging: bool,
}

impl LinkCapture {
    /// 创建新的链接捕获服务
    pub fn new(config: &Config) -> Self {
        Self {
            link_envelope: Duration::from_secs(config.link_timeout_secs),
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            progress_timeout: Duration::from_secs(config.progress_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            stale_retry: RetryPolicy::new(
                config.stale_retry_attempts,
                Duration::from_secs(config.stale_retry_backoff_secs),
            ),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 等出分享链接
    ///
    /// 先在总时间窗口内等两种确认信号之一（跳转 / 锚元素出现），
    /// 然后在重试预算内读取链接地址
    pub async fn capture_shared_link(&self, driver: &PageDriver) -> Result<String> {
        info!("等待分享链接...");
        let origin_url = driver.current_url().await?;
        let origin = origin_url.as_str();

        let signal_poll = PollPolicy::new(self.link_envelope, LINK_SIGNAL_INTERVAL);
        let signal = signal_poll
            .run(|| async move {
                if let Ok(elements) = driver.find_all(SHARED_LINK_SELECTOR).await {
                    if !elements.is_empty() {
                        return Some(LinkSignal::AnchorPresent);
                    }
                }
                match driver.current_url().await {
                    Ok(url) if url != origin => Some(LinkSignal::Redirected),
                    _ => None,
                }
            })
            .await
            .ok_or(AppError::Capture(CaptureError::LinkTimeout {
                secs: self.link_envelope.as_secs(),
            }))?;

        match signal {
            LinkSignal::Redirected => {
                info!("页面已跳转");
                // 等新页面的基础 DOM 就位再去找链接
                driver.wait_for_element("body", self.page_load_timeout).await?;
                info!("新页面已加载");
            }
            LinkSignal::AnchorPresent => {
                info!("链接元素已出现");
            }
        }

        let attempts = self.stale_retry.max_attempts;
        let link = self
            .stale_retry
            .run(|attempt| async move {
                match self.read_link_href(driver).await {
                    Ok(Some(href)) => Ok(href),
                    Ok(None) | Err(_) => {
                        warn!("链接元素已失效，重试... ({}/{})", attempt, attempts);
                        Err(())
                    }
                }
            })
            .await
            .map_err(|_| AppError::Capture(CaptureError::LinkUnavailable { attempts }))?;

        info!("✓ 分享链接: {}", link);
        Ok(link)
    }

    /// 重新定位锚元素并读取链接地址
    ///
    /// 定位和读取之间节点可能已被替换，任何一步失败都按失效处理
    async fn read_link_href(&self, driver: &PageDriver) -> Result<Option<String>> {
        let element = driver.find(SHARED_LINK_SELECTOR).await?;
        let href = element.attribute("href").await.map_err(AppError::from)?;
        let re = Regex::new(r"^https?://\S+$")?;
        match href {
            Some(href) if re.is_match(&href) => Ok(Some(href)),
            Some(href) => {
                warn!("捕获到的链接不是绝对 URL，忽略: {}", href);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// 等上传进度条走到 100
    ///
    /// 每次探测的瞬时失败（进度条还没出现等）直接吸收，继续轮询
    pub async fn wait_for_progress(&self, driver: &PageDriver) -> Result<()> {
        info!("等待上传进度完成...");
        let verbose = self.verbose_logging;
        let poll = PollPolicy::new(self.progress_timeout, self.poll_interval);

        let done = poll
            .run(|| async move {
                match read_progress_value(driver).await {
                    Ok(Some(value)) => {
                        if verbose {
                            info!("当前进度: {}%", value);
                        } else {
                            debug!("当前进度: {}%", value);
                        }
                        (value == "100").then_some(())
                    }
                    Ok(None) => None,
                    Err(e) => {
                        debug!("读取进度条失败: {}", e);
                        None
                    }
                }
            })
            .await;

        done.ok_or(AppError::Capture(CaptureError::ProgressTimeout {
            secs: self.progress_timeout.as_secs(),
        }))?;
        info!("✓ 上传进度已完成");
        Ok(())
    }

    /// 等下载确认按钮出现
    pub async fn wait_for_confirmation(&self, driver: &PageDriver) -> Result<()> {
        info!("检查下载确认按钮...");
        let poll = PollPolicy::new(self.confirm_timeout, self.poll_interval);

        let found = poll
            .run(|| async move {
                match driver.find_all(CONFIRM_SELECTOR).await {
                    Ok(elements) if !elements.is_empty() => Some(()),
                    _ => {
                        debug!("尚未出现下载确认按钮，继续等待...");
                        None
                    }
                }
            })
            .await;

        found.ok_or(AppError::Capture(CaptureError::ConfirmTimeout {
            secs: self.confirm_timeout.as_secs(),
        }))?;
        info!("✓ 下载确认按钮已出现");
        Ok(())
    }
}

/// 读取进度条的当前值
async fn read_progress_value(driver: &PageDriver) -> Result<Option<String>> {
    let element = driver.find(PROGRESS_BAR_SELECTOR).await?;
    let value = element
        .attribute("aria-valuenow")
        .await
        .map_err(AppError::from)?;
    Ok(value)
}
