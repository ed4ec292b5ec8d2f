use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化和运行日志文件的辅助函数
use std::fs;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 订阅器
///
/// 日志级别通过 RUST_LOG 环境变量控制，默认 info。
/// 订阅器在程序边缘配置一次，各组件只往 tracing 门面发结构化事件
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n文件上传日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}
