//! 程序配置
//!
//! 所有超时、轮询间隔和重试次数都是策略，不是散落在流程里的魔法数字。
//! 优先级：默认值 < upload_config.toml < 环境变量

use crate::error::{AppError, AppResult, ConfigError};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// 默认配置文件名
pub const CONFIG_FILE: &str = "upload_config.toml";

/// 运行结束后的回退策略
///
/// 源系统在清理阶段无条件把所有 DONE 文件改回待上传状态，
/// 即使整轮全部成功，于是下一轮会把所有文件重新上传。该行为是否符合
/// 产品意图尚待确认，因此在这里做成显式配置而不是悄悄二选一
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevertPolicy {
    /// 与源系统一致：无论成败，清理阶段回退所有 DONE 文件
    Always,
    /// 修正版：仅在运行失败时回退本轮标记的文件
    OnFailure,
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 待上传压缩包所在目录
    pub zip_dir: String,
    /// 台账文件路径（文件名 -> 分享链接）
    pub ledger_file: String,
    /// 目标服务地址
    pub target_url: String,
    /// 浏览器可执行文件路径（缺省时由 chromiumoxide 自动探测）
    pub chrome_executable: Option<String>,
    /// 浏览器调试端口（设置后连接现有浏览器而不是启动无头浏览器）
    pub browser_debug_port: Option<u16>,
    /// 等待页面基础 DOM 的超时（秒）
    pub page_load_timeout_secs: u64,
    /// 等待上传控件的超时（秒）
    pub upload_control_timeout_secs: u64,
    /// 等待分享链接的总超时（秒），必须大于确认超时
    pub link_timeout_secs: u64,
    /// 等待下载确认按钮的超时（秒）
    pub confirm_timeout_secs: u64,
    /// 等待上传进度完成的超时（秒）
    pub progress_timeout_secs: u64,
    /// 远端轮询间隔（秒），下限，避免高频请求压垮服务
    pub poll_interval_secs: u64,
    /// 链接元素失效后的重试次数
    pub stale_retry_attempts: usize,
    /// 链接元素失效重试的间隔（秒）
    pub stale_retry_backoff_secs: u64,
    /// 每个文件处理完后的静置时间（秒），等待系统释放文件句柄
    pub settle_delay_secs: u64,
    /// 是否跟踪上传进度条
    pub track_upload_progress: bool,
    /// 清理阶段的回退策略
    pub revert_policy: RevertPolicy,
    /// 运行间隔（秒），0 表示只跑一轮
    pub run_interval_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zip_dir: "zip".to_string(),
            ledger_file: "output.csv".to_string(),
            target_url: "https://filebin.net".to_string(),
            chrome_executable: None,
            browser_debug_port: None,
            page_load_timeout_secs: 20,
            upload_control_timeout_secs: 30,
            link_timeout_secs: 300,
            confirm_timeout_secs: 120,
            progress_timeout_secs: 600,
            poll_interval_secs: 5,
            stale_retry_attempts: 3,
            stale_retry_backoff_secs: 2,
            settle_delay_secs: 5,
            track_upload_progress: true,
            revert_policy: RevertPolicy::Always,
            run_interval_secs: 0,
            verbose_logging: false,
            output_log_file: "console.log".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：若当前目录存在 upload_config.toml 则读取，
    /// 然后用环境变量覆盖
    pub fn load() -> Result<Self> {
        let base = if Path::new(CONFIG_FILE).exists() {
            let content = std::fs::read_to_string(CONFIG_FILE)
                .with_context(|| format!("无法读取配置文件: {}", CONFIG_FILE))?;
            toml::from_str(&content)
                .with_context(|| format!("无法解析配置文件: {}", CONFIG_FILE))?
        } else {
            Self::default()
        };
        Ok(base.apply_env())
    }

    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    fn apply_env(self) -> Self {
        Self {
            zip_dir: std::env::var("ZIP_DIR").unwrap_or(self.zip_dir),
            ledger_file: std::env::var("LEDGER_FILE").unwrap_or(self.ledger_file),
            target_url: std::env::var("TARGET_URL").unwrap_or(self.target_url),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(self.chrome_executable),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).or(self.browser_debug_port),
            page_load_timeout_secs: std::env::var("PAGE_LOAD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.page_load_timeout_secs),
            upload_control_timeout_secs: std::env::var("UPLOAD_CONTROL_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.upload_control_timeout_secs),
            link_timeout_secs: std::env::var("LINK_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.link_timeout_secs),
            confirm_timeout_secs: std::env::var("CONFIRM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.confirm_timeout_secs),
            progress_timeout_secs: std::env::var("PROGRESS_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.progress_timeout_secs),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.poll_interval_secs),
            stale_retry_attempts: std::env::var("STALE_RETRY_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.stale_retry_attempts),
            stale_retry_backoff_secs: std::env::var("STALE_RETRY_BACKOFF_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.stale_retry_backoff_secs),
            settle_delay_secs: std::env::var("SETTLE_DELAY_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.settle_delay_secs),
            track_upload_progress: std::env::var("TRACK_UPLOAD_PROGRESS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.track_upload_progress),
            revert_policy: std::env::var("REVERT_POLICY").ok().and_then(|v| parse_revert_policy(&v)).unwrap_or(self.revert_policy),
            run_interval_secs: std::env::var("RUN_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(self.run_interval_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 校验超时约束
    ///
    /// 链接的出现先于打包完成，所以链接等待窗口必须覆盖确认等待窗口；
    /// 轮询间隔为 0 会高频轰炸远端服务
    pub fn validate(&self) -> AppResult<()> {
        if self.link_timeout_secs <= self.confirm_timeout_secs {
            return Err(AppError::Config(ConfigError::InvalidTimeouts {
                link_secs: self.link_timeout_secs,
                confirm_secs: self.confirm_timeout_secs,
            }));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config(ConfigError::ZeroPollInterval));
        }
        Ok(())
    }
}

fn parse_revert_policy(value: &str) -> Option<RevertPolicy> {
    match value.to_ascii_lowercase().as_str() {
        "always" => Some(RevertPolicy::Always),
        "on-failure" | "on_failure" => Some(RevertPolicy::OnFailure),
        _ => None,
    }
}
