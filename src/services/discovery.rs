//! 文件发现服务 - 业务能力层
//!
//! 只负责"列出待上传文件"能力，不关心流程

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, FileError};
use crate::models::CandidateFile;

/// 文件发现服务
///
/// 职责：
/// - 列出监视目录中所有待上传的压缩包
/// - 完成标记的文件一律不出现在结果里
/// - 目录不存在时创建
/// - 空目录是正常的"无事可做"，不是错误
pub struct FileDiscovery {
    dir: PathBuf,
}

impl FileDiscovery {
    /// 创建新的文件发现服务
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 监视的目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 扫描目录，返回按文件名排序的待上传文件列表
    pub fn discover(&self) -> Result<Vec<CandidateFile>> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                AppError::File(FileError::DirectoryCreateFailed {
                    path: self.dir.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            info!("已创建目录: {}", self.dir.display());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| self.read_dir_err(e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.read_dir_err(e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if !CandidateFile::is_pending_archive(name) {
                continue;
            }
            if let Some(candidate) = CandidateFile::from_path(&path) {
                debug!("发现待上传文件: {}", name);
                files.push(candidate);
            }
        }

        // 保证每轮处理顺序稳定
        files.sort_by(|a, b| a.base_name.cmp(&b.base_name));
        Ok(files)
    }

    fn read_dir_err(&self, e: std::io::Error) -> AppError {
        AppError::File(FileError::ReadDirFailed {
            path: self.dir.display().to_string(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_discover_excludes_done_files() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        File::create(dir.path().join("x.zip")).unwrap();
        File::create(dir.path().join("y-DONE.zip")).unwrap();

        let discovery = FileDiscovery::new(dir.path());
        let files = discovery.discover().expect("扫描目录失败");

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].base_name, "x.zip");
    }

    #[test]
    fn test_discover_ignores_non_archives() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("a.zip")).unwrap();
        File::create(dir.path().join("readme.md")).unwrap();

        let discovery = FileDiscovery::new(dir.path());
        let files = discovery.discover().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].base_name, "a.zip");
    }

    #[test]
    fn test_discover_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.zip")).unwrap();
        File::create(dir.path().join("a.zip")).unwrap();
        File::create(dir.path().join("c.zip")).unwrap();

        let discovery = FileDiscovery::new(dir.path());
        let names: Vec<_> = discovery
            .discover()
            .unwrap()
            .into_iter()
            .map(|f| f.base_name)
            .collect();

        assert_eq!(names, vec!["a.zip", "b.zip", "c.zip"]);
    }

    #[test]
    fn test_discover_creates_missing_dir_and_returns_empty() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("zip");

        let discovery = FileDiscovery::new(&dir);
        let files = discovery.discover().expect("空目录不应是错误");

        assert!(files.is_empty());
        assert!(dir.exists());
    }
}
