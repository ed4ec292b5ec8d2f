//! 候选文件模型
//!
//! 文件状态直接编码在文件名里：待上传文件以 `.zip` 结尾，
//! 完成的文件在扩展名前插入 `-DONE` 标记（`report.zip` -> `report-DONE.zip`）。
//! 发现和状态跟踪都只看文件名，不依赖任何额外的元数据。

use std::path::{Path, PathBuf};

/// 压缩包扩展名
pub const ARCHIVE_EXT: &str = ".zip";

/// 完成标记，插入在扩展名之前
pub const DONE_MARKER: &str = "-DONE";

/// 文件的磁盘状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTag {
    /// 待上传
    Pending,
    /// 已上传完成
    Done,
}

/// 一个等待上传或已完成上传的压缩包
///
/// `base_name` 始终是待上传形式的文件名（如 `report.zip`），
/// 同时也是台账里的键。
/// 不变量：同一个 `base_name` 在每种状态下至多存在一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// 磁盘上的位置
    pub path: PathBuf,
    /// 台账键（待上传形式的文件名）
    pub base_name: String,
    /// 磁盘状态
    pub tag: FileTag,
}

impl CandidateFile {
    /// 从磁盘路径解析候选文件，非压缩包返回 None
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if !name.ends_with(ARCHIVE_EXT) {
            return None;
        }

        let done_suffix = format!("{}{}", DONE_MARKER, ARCHIVE_EXT);
        if let Some(stem) = name.strip_suffix(&done_suffix) {
            return Some(Self {
                path: path.to_path_buf(),
                base_name: format!("{}{}", stem, ARCHIVE_EXT),
                tag: FileTag::Done,
            });
        }

        Some(Self {
            path: path.to_path_buf(),
            base_name: name.to_string(),
            tag: FileTag::Pending,
        })
    }

    /// 判断文件名是否是待上传的压缩包
    pub fn is_pending_archive(name: &str) -> bool {
        name.ends_with(ARCHIVE_EXT) && !name.contains(DONE_MARKER)
    }

    /// 完成状态的文件名（`report.zip` -> `report-DONE.zip`）
    pub fn done_file_name(&self) -> String {
        let stem = self.base_name.strip_suffix(ARCHIVE_EXT).unwrap_or(&self.base_name);
        format!("{}{}{}", stem, DONE_MARKER, ARCHIVE_EXT)
    }

    /// 完成状态的完整路径
    pub fn done_path(&self) -> PathBuf {
        self.path.with_file_name(self.done_file_name())
    }

    /// 待上传状态的完整路径
    pub fn pending_path(&self) -> PathBuf {
        self.path.with_file_name(&self.base_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pending_file() {
        let file = CandidateFile::from_path(Path::new("zip/report.zip")).expect("应能解析");
        assert_eq!(file.base_name, "report.zip");
        assert_eq!(file.tag, FileTag::Pending);
    }

    #[test]
    fn test_parse_done_file() {
        let file = CandidateFile::from_path(Path::new("zip/report-DONE.zip")).expect("应能解析");
        assert_eq!(file.base_name, "report.zip");
        assert_eq!(file.tag, FileTag::Done);
    }

    #[test]
    fn test_non_archive_is_rejected() {
        assert!(CandidateFile::from_path(Path::new("zip/notes.txt")).is_none());
        assert!(CandidateFile::from_path(Path::new("zip")).is_none());
    }

    #[test]
    fn test_done_name_round_trip() {
        let file = CandidateFile::from_path(Path::new("zip/report.zip")).unwrap();
        assert_eq!(file.done_file_name(), "report-DONE.zip");

        let done = CandidateFile::from_path(&file.done_path()).unwrap();
        assert_eq!(done.base_name, "report.zip");
        assert_eq!(done.pending_path(), Path::new("zip/report.zip"));
    }

    #[test]
    fn test_pending_filter_excludes_done() {
        assert!(CandidateFile::is_pending_archive("x.zip"));
        assert!(!CandidateFile::is_pending_archive("y-DONE.zip"));
        assert!(!CandidateFile::is_pending_archive("readme.md"));
    }
}
