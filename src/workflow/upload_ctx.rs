//! 上传上下文
//!
//! 封装"我正在处理本轮第几个文件"这一信息

use std::fmt::Display;

/// 上传上下文
///
/// 包含处理单个文件所需的全部上下文信息
#[derive(Debug, Clone)]
pub struct UploadCtx {
    /// 文件名（台账键）
    pub base_name: String,

    /// 文件在本轮中的序号（从1开始，仅用于日志显示）
    pub file_index: usize,

    /// 本轮文件总数
    pub total: usize,
}

impl UploadCtx {
    /// 创建新的上传上下文
    pub fn new(base_name: String, file_index: usize, total: usize) -> Self {
        Self {
            base_name,
            file_index,
            total,
        }
    }
}

impl Display for UploadCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文件 {}/{} {}]",
            self.file_index, self.total, self.base_name
        )
    }
}
