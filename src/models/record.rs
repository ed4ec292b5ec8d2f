//! 台账记录模型

/// 台账中的一条记录：文件名到分享链接的映射
///
/// 以 `base_name` 为唯一键；同一个键至多存在一条记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    /// 文件名（台账键）
    pub base_name: String,
    /// 上传服务返回的公开分享链接
    pub shared_link: String,
}

impl LedgerRecord {
    pub fn new(base_name: impl Into<String>, shared_link: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            shared_link: shared_link.into(),
        }
    }
}
