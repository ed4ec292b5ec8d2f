//! 文件状态跟踪服务 - 业务能力层
//!
//! 只负责在磁盘上给文件改名打标记，不关心流程
//!
//! 状态编码在文件名里（`report.zip` <-> `report-DONE.zip`），
//! 因此崩溃之后下一轮运行看一眼目录就知道该恢复什么

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, FileError};
use crate::models::{CandidateFile, FileTag};

/// 文件状态跟踪服务
///
/// 职责：
/// - 上传完成后把文件从待上传标记改为完成标记
/// - 记住本轮标记过哪些文件，支持只回退本轮
/// - 把目录里所有完成标记的文件改回待上传（恢复/清理）
pub struct FileStateTracker {
    dir: PathBuf,
    /// 本轮运行标记为完成的文件
    marked: Vec<CandidateFile>,
}

impl FileStateTracker {
    /// 创建新的状态跟踪服务
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            marked: Vec::new(),
        }
    }

    /// 把文件从待上传改名为完成
    ///
    /// 只能在台账写入成功之后调用：没有记录的文件绝不标记完成。
    /// 目标名已存在时拒绝覆盖
    pub fn mark_done(&mut self, candidate: &CandidateFile) -> Result<PathBuf> {
        let done_path = candidate.done_path();
        if done_path.exists() {
            return Err(AppError::File(FileError::TargetExists {
                path: done_path.display().to_string(),
            })
            .into());
        }

        fs::rename(&candidate.path, &done_path).map_err(|e| {
            AppError::rename_failed(
                candidate.path.display().to_string(),
                done_path.display().to_string(),
                e,
            )
        })?;

        info!("✓ 文件已标记完成: {}", done_path.display());
        self.marked.push(candidate.clone());
        Ok(done_path)
    }

    /// 把目录里所有完成标记的文件改回待上传
    ///
    /// # 返回
    /// 返回回退的文件数量
    pub fn revert_all(&mut self) -> Result<usize> {
        self.marked.clear();
        if !self.dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AppError::File(FileError::ReadDirFailed {
                path: self.dir.display().to_string(),
                source: Box::new(e),
            })
        })?;

        let mut reverted = 0;
        for entry in entries {
            let entry = entry.map_err(|e| {
                AppError::File(FileError::ReadDirFailed {
                    path: self.dir.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            let path = entry.path();
            let Some(candidate) = CandidateFile::from_path(&path) else {
                continue;
            };
            if candidate.tag != FileTag::Done {
                continue;
            }
            reverted += revert_one(&path, &candidate.pending_path())?;
        }
        Ok(reverted)
    }

    /// 只把本轮标记为完成的文件改回待上传
    ///
    /// 之前轮次留下的完成文件不动
    pub fn revert_marked(&mut self) -> Result<usize> {
        let marked = std::mem::take(&mut self.marked);
        let mut reverted = 0;
        for candidate in marked {
            let done_path = candidate.done_path();
            if !done_path.exists() {
                continue;
            }
            reverted += revert_one(&done_path, &candidate.pending_path())?;
        }
        Ok(reverted)
    }
}

fn revert_one(from: &Path, to: &Path) -> Result<usize> {
    if to.exists() {
        warn!("⚠️ 待上传文件已存在，跳过回退: {}", to.display());
        return Ok(0);
    }
    fs::rename(from, to)
        .map_err(|e| AppError::rename_failed(from.display().to_string(), to.display().to_string(), e))?;
    info!("已恢复文件名: {}", to.display());
    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn pending(dir: &Path, name: &str) -> CandidateFile {
        let path = dir.join(name);
        File::create(&path).unwrap();
        CandidateFile::from_path(&path).unwrap()
    }

    #[test]
    fn test_mark_done_renames_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileStateTracker::new(dir.path());
        let candidate = pending(dir.path(), "report.zip");

        let done_path = tracker.mark_done(&candidate).expect("改名失败");

        assert!(!candidate.path.exists());
        assert!(done_path.exists());
        assert_eq!(done_path.file_name().unwrap(), "report-DONE.zip");
    }

    #[test]
    fn test_mark_done_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileStateTracker::new(dir.path());
        let candidate = pending(dir.path(), "report.zip");
        File::create(dir.path().join("report-DONE.zip")).unwrap();

        assert!(tracker.mark_done(&candidate).is_err());
        // 原文件原地不动
        assert!(candidate.path.exists());
    }

    #[test]
    fn test_revert_all_covers_leftovers_from_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileStateTracker::new(dir.path());

        // 上一轮异常中断留下的文件，本轮 tracker 没标记过它
        File::create(dir.path().join("old-DONE.zip")).unwrap();
        let candidate = pending(dir.path(), "new.zip");
        tracker.mark_done(&candidate).unwrap();

        let reverted = tracker.revert_all().expect("回退失败");

        assert_eq!(reverted, 2);
        assert!(dir.path().join("old.zip").exists());
        assert!(dir.path().join("new.zip").exists());
    }

    #[test]
    fn test_revert_marked_only_touches_this_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileStateTracker::new(dir.path());

        File::create(dir.path().join("old-DONE.zip")).unwrap();
        let candidate = pending(dir.path(), "new.zip");
        tracker.mark_done(&candidate).unwrap();

        let reverted = tracker.revert_marked().expect("回退失败");

        assert_eq!(reverted, 1);
        assert!(dir.path().join("new.zip").exists());
        // 之前轮次的完成文件保持原样
        assert!(dir.path().join("old-DONE.zip").exists());
    }

    #[test]
    fn test_revert_marked_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = FileStateTracker::new(dir.path());
        let candidate = pending(dir.path(), "a.zip");
        tracker.mark_done(&candidate).unwrap();

        assert_eq!(tracker.revert_marked().unwrap(), 1);
        assert_eq!(tracker.revert_marked().unwrap(), 0);
    }
}
