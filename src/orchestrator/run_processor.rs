//! 运行编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一轮运行的生命周期和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：校验配置、探测服务、建立浏览器会话
//! 2. **启动恢复**：回收上一轮异常中断留下的完成标记
//! 3. **顺序处理**：逐个驱动 UploadFlow，第一个未处理错误中止剩余文件
//! 4. **保证清理**：无论成败都执行回退策略，然后关闭会话
//! 5. **资源管理**：唯一持有 Browser 和 PageDriver 的模块
//! 6. **全局统计**：汇总本轮的处理结果

use anyhow::Result;
use chromiumoxide::Browser;
use tracing::{error, info, warn};

use crate::browser;
use crate::config::{Config, RevertPolicy};
use crate::infrastructure::PageDriver;
use crate::services::{FileDiscovery, FileStateTracker, Ledger, ServiceProbe};
use crate::utils::logging;
use crate::workflow::{UploadCtx, UploadFlow};

/// 应用主结构
pub struct App {
    config: Config,
    browser: Browser,
    driver: PageDriver,
    discovery: FileDiscovery,
    ledger: Ledger,
    tracker: FileStateTracker,
    flow: UploadFlow,
}

/// 一轮运行的统计
#[derive(Debug, Default)]
pub struct RunStats {
    pub total: usize,
    pub uploaded: usize,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        // 初始化日志文件
        logging::init_log_file(&config.output_log_file)?;
        log_startup(&config);

        // 运行前探测：目标服务必须可达；连接模式下调试端口必须在听。
        // 服务不可达没有本地重试的意义，立即失败交给外层调度
        let probe = ServiceProbe::new()?;
        probe.check_service(&config.target_url).await?;
        if let Some(port) = config.browser_debug_port {
            probe.check_devtools(port).await?;
        }

        // 建立本轮唯一的浏览器会话
        let (browser, page) = browser::start_session(&config).await?;
        let driver = PageDriver::new(page);

        let discovery = FileDiscovery::new(&config.zip_dir);
        let ledger = Ledger::new(&config.ledger_file);
        let tracker = FileStateTracker::new(&config.zip_dir);
        let flow = UploadFlow::new(&config);

        Ok(Self {
            config,
            browser,
            driver,
            discovery,
            ledger,
            tracker,
            flow,
        })
    }

    /// 执行一轮运行
    ///
    /// 副作用仅限台账重写和文件改名。无论成败，清理阶段都会执行，
    /// 然后关闭浏览器会话，最后才把错误交还调用方
    pub async fn run(mut self) -> Result<RunStats> {
        let outcome = self.run_inner().await;

        // ========== 保证清理阶段 ==========
        self.cleanup_phase(outcome.is_ok());
        self.shutdown().await;

        match outcome {
            Ok(stats) => {
                print_final_stats(&stats, &self.config);
                Ok(stats)
            }
            Err(e) => {
                error!("❌ 本轮运行失败: {:#}", e);
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunStats> {
        // 启动恢复：Always 语义下完成标记只在一轮内部存在，
        // 开跑前还留着的一定是上一轮异常中断的遗留
        if self.config.revert_policy == RevertPolicy::Always {
            let recovered = self.tracker.revert_all()?;
            if recovered > 0 {
                info!("♻️ 已回收上一轮遗留的 {} 个完成标记", recovered);
            }
        }

        info!("\n📁 正在扫描待上传的压缩包...");
        let files = self.discovery.discover()?;

        if files.is_empty() {
            // 无事可做是正常结局，不是错误
            info!(
                "目录 {} 中没有待上传的压缩包，本轮结束",
                self.discovery.dir().display()
            );
            return Ok(RunStats::default());
        }

        let total = files.len();
        log_files_found(total);

        let mut stats = RunStats { total, uploaded: 0 };

        // 严格顺序处理：浏览器会话是独占资源，一次只有一个文件在途
        for (index, candidate) in files.iter().enumerate() {
            let ctx = UploadCtx::new(candidate.base_name.clone(), index + 1, total);
            log_file_start(&ctx);

            // 第一个未处理错误中止剩余文件，清理阶段随后执行
            let link = self
                .flow
                .run(&self.driver, &self.ledger, &mut self.tracker, candidate, &ctx)
                .await?;
            stats.uploaded += 1;
            info!("[文件 {}] ✅ 处理完成: {}", ctx.file_index, link);

            // 刷新页面，避免上个文件的页面状态污染下一个
            self.driver.refresh().await?;
        }

        Ok(stats)
    }

    /// 清理阶段
    ///
    /// 清理自身的错误只记日志不向上抛，避免覆盖运行本身的错误
    fn cleanup_phase(&mut self, run_succeeded: bool) {
        let result = match self.config.revert_policy {
            RevertPolicy::Always => {
                info!("🗑️ 清理阶段: 回退所有完成标记的文件");
                self.tracker.revert_all()
            }
            RevertPolicy::OnFailure if !run_succeeded => {
                info!("🗑️ 清理阶段: 回退本轮标记的文件");
                self.tracker.revert_marked()
            }
            RevertPolicy::OnFailure => {
                info!("清理阶段: 运行成功，完成标记保持不动");
                Ok(0)
            }
        };

        match result {
            Ok(count) if count > 0 => info!("已回退 {} 个文件", count),
            Ok(_) => {}
            Err(e) => error!("⚠️ 清理阶段失败: {:#}", e),
        }
    }

    /// 关闭浏览器会话
    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("关闭浏览器失败: {}", e);
        }
    }
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 压缩包自动上传");
    info!("📁 监视目录: {}", config.zip_dir);
    info!("📋 台账文件: {}", config.ledger_file);
    info!("🌐 目标服务: {}", config.target_url);
    info!("{}", "=".repeat(60));
}

fn log_files_found(total: usize) {
    info!("✓ 找到 {} 个待上传的压缩包", total);
    info!("💡 将严格按顺序逐个上传\n");
}

fn log_file_start(ctx: &UploadCtx) {
    info!("\n{}", "─".repeat(60));
    info!(
        "[文件 {}] 开始处理第 {}/{} 个: {}",
        ctx.file_index, ctx.file_index, ctx.total, ctx.base_name
    );
}

fn print_final_stats(stats: &RunStats, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 本轮处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功上传: {}/{}", stats.uploaded, stats.total);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", config.output_log_file);
}
