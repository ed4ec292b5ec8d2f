//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一轮运行的完整生命周期，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! run_processor (一轮运行: Vec<CandidateFile>)
//!     ↓
//! workflow::UploadFlow (处理单个 CandidateFile)
//!     ↓
//! services (能力层: discovery / link_capture / ledger / tracker / preflight)
//!     ↓
//! infrastructure (基础设施: PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 Browser 和 PageDriver
//! 2. **严格顺序**：浏览器会话独占，一次只有一个文件在途
//! 3. **保证清理**：无论成败，回退策略都会在会话关闭前执行
//! 4. **无业务逻辑**：只做调度和统计，不做具体页面交互

pub mod run_processor;

// 重新导出主要类型
pub use run_processor::{App, RunStats};
