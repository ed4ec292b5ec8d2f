//! 浏览器会话管理
//!
//! 一轮运行只有一个浏览器会话：要么连接已有浏览器的调试端口，
//! 要么启动一个新的无头浏览器

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

use anyhow::Result;
use chromiumoxide::{Browser, Page};

use crate::config::Config;

/// 按配置建立浏览器会话
///
/// 配置了 `browser_debug_port` 则连接现有浏览器，否则启动无头浏览器
pub async fn start_session(config: &Config) -> Result<(Browser, Page)> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_headless_browser(config).await,
    }
}
