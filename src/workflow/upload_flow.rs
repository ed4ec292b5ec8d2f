//! 上传流程 - 流程层
//!
//! 核心职责：定义"一个文件"的完整上传流程
//!
//! 流程顺序：
//! 1. 导航 → 等基础 DOM
//! 2. 定位上传控件（超时则脚本强制可见，显式降级路径）
//! 3. 填入文件路径
//! 4. 等分享链接（跳转信号与锚元素信号赛跑）
//! 5. 等进度条、等下载确认
//! 6. 写台账 → 静置 → 改名标记完成
//!
//! 不变量：台账写入在改名之前，没有记录的文件绝不标记完成

use anyhow::{Context, Result};
use chromiumoxide::Element;
use std::fmt::Display;
use std::fs;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::CandidateFile;
use crate::services::{FileStateTracker, Ledger, LinkCapture};
use crate::workflow::upload_ctx::UploadCtx;

/// 上传控件
const UPLOAD_INPUT_SELECTOR: &str = "input.upload";
/// 页面基础 DOM
const BODY_SELECTOR: &str = "body";

/// 单个文件的流程状态
///
/// 成功路径上只向前推进，任何一步失败立即进入 Failed，
/// 状态只在本进程内存在，不跨重启持久化
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadState {
    /// 已被发现，尚未动浏览器
    Discovered,
    /// 落地页已就位
    Navigated,
    /// 文件路径已填入上传控件
    Submitted,
    /// 正在等服务端发链接
    AwaitingLink,
    /// 已拿到分享链接
    LinkCaptured,
    /// 链接已写入台账
    Recorded,
    /// 文件已标记完成
    Finalized,
    /// 任何一步失败的终态
    Failed,
}

impl Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UploadState::Discovered => "已发现",
            UploadState::Navigated => "已导航",
            UploadState::Submitted => "已提交",
            UploadState::AwaitingLink => "等待链接",
            UploadState::LinkCaptured => "已捕获链接",
            UploadState::Recorded => "已记录",
            UploadState::Finalized => "已完成",
            UploadState::Failed => "失败",
        };
        write!(f, "{}", label)
    }
}

/// 上传流程
///
/// - 编排单个文件从导航到标记完成的全部步骤
/// - 不持有任何资源（page / 台账 / 跟踪器都由编排层传入）
/// - 只依赖业务能力（services）
pub struct UploadFlow {
    target_url: String,
    link_capture: LinkCapture,
    page_load_timeout: Duration,
    upload_control_timeout: Duration,
    settle_delay: Duration,
    track_upload_progress: bool,
}

impl UploadFlow {
    /// 创建新的上传流程
    pub fn new(config: &Config) -> Self {
        Self {
            target_url: config.target_url.clone(),
            link_capture: LinkCapture::new(config),
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            upload_control_timeout: Duration::from_secs(config.upload_control_timeout_secs),
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            track_upload_progress: config.track_upload_progress,
        }
    }

    /// 执行一个文件的完整上传流程
    ///
    /// # 返回
    /// 成功时返回捕获的分享链接；失败时带上出错的阶段信息
    pub async fn run(
        &self,
        driver: &PageDriver,
        ledger: &Ledger,
        tracker: &mut FileStateTracker,
        candidate: &CandidateFile,
        ctx: &UploadCtx,
    ) -> Result<String> {
        let mut state = UploadState::Discovered;
        match self
            .run_steps(driver, ledger, tracker, candidate, ctx, &mut state)
            .await
        {
            Ok(link) => Ok(link),
            Err(e) => {
                let failed_at = state;
                state = UploadState::Failed;
                error!(
                    "[文件 {}] ❌ 上传失败 (阶段: {}, 终态: {}): {}",
                    ctx.file_index, failed_at, state, e
                );
                Err(e).with_context(|| format!("{} 在 {} 阶段失败", ctx, failed_at))
            }
        }
    }

    async fn run_steps(
        &self,
        driver: &PageDriver,
        ledger: &Ledger,
        tracker: &mut FileStateTracker,
        candidate: &CandidateFile,
        ctx: &UploadCtx,
        state: &mut UploadState,
    ) -> Result<String> {
        // ========== 1. 导航 ==========
        info!("[文件 {}] 正在打开 {} ...", ctx.file_index, self.target_url);
        driver.navigate(&self.target_url).await?;
        driver
            .wait_for_element(BODY_SELECTOR, self.page_load_timeout)
            .await?;
        info!("[文件 {}] 页面已加载", ctx.file_index);
        advance(state, UploadState::Navigated, ctx);

        // ========== 2. 定位上传控件 ==========
        let input = self.locate_upload_control(driver, ctx).await?;

        // ========== 3. 提交文件 ==========
        // 浏览器进程需要绝对路径
        let file_path = fs::canonicalize(&candidate.path)
            .with_context(|| format!("无法解析文件路径: {}", candidate.path.display()))?;
        driver.set_file_input(&input, &file_path).await?;
        info!("[文件 {}] 📤 文件已提交: {}", ctx.file_index, candidate.base_name);
        advance(state, UploadState::Submitted, ctx);

        // ========== 4. 等分享链接 ==========
        advance(state, UploadState::AwaitingLink, ctx);
        let link = self.link_capture.capture_shared_link(driver).await?;
        advance(state, UploadState::LinkCaptured, ctx);

        // ========== 5. 等打包就绪 ==========
        if self.track_upload_progress {
            self.link_capture.wait_for_progress(driver).await?;
        }
        self.link_capture.wait_for_confirmation(driver).await?;

        // ========== 6. 写台账 ==========
        ledger.upsert(&candidate.base_name, &link)?;
        advance(state, UploadState::Recorded, ctx);

        // 静置片刻，等系统释放文件句柄再改名
        sleep(self.settle_delay).await;

        // ========== 7. 标记完成 ==========
        tracker.mark_done(candidate)?;
        advance(state, UploadState::Finalized, ctx);

        Ok(link)
    }

    /// 定位上传控件
    ///
    /// 控件在限定时间内没就位时走降级路径：脚本强制可见后重新定位。
    /// 这是显式的、有日志的降级，不是静默失败
    async fn locate_upload_control(
        &self,
        driver: &PageDriver,
        ctx: &UploadCtx,
    ) -> Result<Element> {
        match driver
            .wait_for_element(UPLOAD_INPUT_SELECTOR, self.upload_control_timeout)
            .await
        {
            Ok(element) => {
                info!("[文件 {}] 上传控件已找到", ctx.file_index);
                Ok(element)
            }
            Err(e) => {
                warn!(
                    "[文件 {}] ⚠️ 上传控件不可用: {}，尝试脚本强制可见",
                    ctx.file_index, e
                );
                driver.force_visible(UPLOAD_INPUT_SELECTOR).await?;
                let element = driver.find(UPLOAD_INPUT_SELECTOR).await?;
                info!("[文件 {}] 上传控件已通过脚本变为可交互", ctx.file_index);
                Ok(element)
            }
        }
    }
}

/// 推进流程状态
fn advance(state: &mut UploadState, next: UploadState, ctx: &UploadCtx) {
    debug!("[文件 {}] 状态: {} -> {}", ctx.file_index, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 成功路径上的状态序列
    const SUCCESS_PATH: [UploadState; 7] = [
        UploadState::Discovered,
        UploadState::Navigated,
        UploadState::Submitted,
        UploadState::AwaitingLink,
        UploadState::LinkCaptured,
        UploadState::Recorded,
        UploadState::Finalized,
    ];

    #[test]
    fn test_success_path_is_strictly_forward() {
        for pair in SUCCESS_PATH.windows(2) {
            assert!(pair[0] < pair[1], "{} 应在 {} 之前", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_is_reachable_from_every_state() {
        for state in SUCCESS_PATH {
            assert!(state < UploadState::Failed);
        }
    }

    #[test]
    fn test_advance_moves_state() {
        let ctx = UploadCtx::new("report.zip".to_string(), 1, 1);
        let mut state = UploadState::Discovered;
        advance(&mut state, UploadState::Navigated, &ctx);
        assert_eq!(state, UploadState::Navigated);
    }
}
