use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use upload_to_filebin::utils::logging;
use upload_to_filebin::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::load()?;

    // 只跑一轮
    if config.run_interval_secs == 0 {
        App::initialize(config).await?.run().await?;
        return Ok(());
    }

    // 定时循环：单轮失败只记日志，等下一轮整体重试
    let interval = Duration::from_secs(config.run_interval_secs);
    loop {
        match App::initialize(config.clone()).await {
            Ok(app) => {
                if let Err(e) = app.run().await {
                    error!("本轮运行失败，等待下一轮重试: {:#}", e);
                }
            }
            Err(e) => error!("初始化失败，等待下一轮重试: {:#}", e),
        }
        info!("⏳ 等待 {} 秒后开始下一轮...", config.run_interval_secs);
        sleep(interval).await;
    }
}
