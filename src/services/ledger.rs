//! 台账服务 - 业务能力层
//!
//! 只负责"记一条文件名到分享链接的映射"能力，不关心流程
//!
//! 台账是无表头的逐行文本表，每行两个字段：文件名、分享链接。
//! upsert 的语义：读出全部行，命中键的行原地替换链接，未命中则
//! 追加新行，然后把完整行集写到临时文件并原子替换。崩溃时
//! 旧台账保持完整，绝不出现写了一半的文件

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, LedgerError};
use crate::models::LedgerRecord;

/// 台账服务
///
/// 单写者：同一时刻只有一轮运行在写台账，因此不需要加锁，
/// 只需要替换是原子的
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// 创建新的台账服务
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 台账文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 插入或更新一条记录
    ///
    /// # 参数
    /// - `base_name`: 文件名（台账键）
    /// - `shared_link`: 分享链接
    ///
    /// 已有键被更新时其他行原样保留，相对顺序不变；
    /// 对同样的参数重复调用不会产生重复行
    pub fn upsert(&self, base_name: &str, shared_link: &str) -> Result<()> {
        let mut rows = self.read_rows()?;
        let mut updated = false;

        for row in rows.iter_mut() {
            if row.first().map(String::as_str) == Some(base_name) {
                if row.len() >= 2 {
                    row[1] = shared_link.to_string();
                } else {
                    row.push(shared_link.to_string());
                }
                updated = true;
            }
        }

        if !updated {
            rows.push(vec![base_name.to_string(), shared_link.to_string()]);
        }

        self.write_rows_atomic(&rows)?;

        if updated {
            info!("台账已更新: {} -> {}", base_name, shared_link);
        } else {
            info!("台账已追加: {} -> {}", base_name, shared_link);
        }
        Ok(())
    }

    /// 读取全部记录（每行的前两个字段）
    pub fn records(&self) -> Result<Vec<LedgerRecord>> {
        let rows = self.read_rows()?;
        Ok(rows
            .into_iter()
            .filter(|row| !row.is_empty())
            .map(|row| LedgerRecord {
                shared_link: row.get(1).cloned().unwrap_or_default(),
                base_name: row.into_iter().next().unwrap_or_default(),
            })
            .collect())
    }

    /// 读出台账的全部行，保留字段数不规则的行
    fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        if !self.path.exists() {
            debug!("台账文件不存在，视为空台账: {}", self.path.display());
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.read_err(e))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| self.read_err(e))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    /// 把完整行集写到临时文件再原子替换台账
    fn write_rows_atomic(&self, rows: &[Vec<String>]) -> Result<()> {
        let tmp_path = {
            let mut os = self.path.as_os_str().to_os_string();
            os.push(".tmp");
            PathBuf::from(os)
        };

        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(&tmp_path)
                .map_err(|e| self.write_err(e))?;
            for row in rows {
                writer.write_record(row).map_err(|e| self.write_err(e))?;
            }
            writer.flush().map_err(|e| {
                AppError::Ledger(LedgerError::WriteFailed {
                    path: tmp_path.display().to_string(),
                    source: Box::new(e),
                })
            })?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            AppError::Ledger(LedgerError::ReplaceFailed {
                path: self.path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(())
    }

    fn read_err(&self, e: csv::Error) -> AppError {
        AppError::Ledger(LedgerError::ReadFailed {
            path: self.path.display().to_string(),
            source: Box::new(e),
        })
    }

    fn write_err(&self, e: csv::Error) -> AppError {
        AppError::Ledger(LedgerError::WriteFailed {
            path: self.path.display().to_string(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_in(dir: &Path) -> Ledger {
        Ledger::new(dir.join("output.csv"))
    }

    #[test]
    fn test_upsert_creates_ledger_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        ledger.upsert("report.zip", "https://filebin.net/abc").expect("写入失败");

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], LedgerRecord::new("report.zip", "https://filebin.net/abc"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        ledger.upsert("report.zip", "https://filebin.net/abc").unwrap();
        ledger.upsert("report.zip", "https://filebin.net/abc").unwrap();

        let records = ledger.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].shared_link, "https://filebin.net/abc");
    }

    #[test]
    fn test_upsert_replaces_in_place_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        ledger.upsert("a.zip", "L1").unwrap();
        ledger.upsert("b.zip", "L2").unwrap();
        ledger.upsert("a.zip", "L3").unwrap();

        let records = ledger.records().unwrap();
        assert_eq!(
            records,
            vec![LedgerRecord::new("a.zip", "L3"), LedgerRecord::new("b.zip", "L2")]
        );
    }

    #[test]
    fn test_upsert_preserves_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        // 历史台账里可能混着手工编辑过的行
        fs::write(
            ledger.path(),
            "a.zip,L1\nonly-a-name.zip\nc.zip,L3,manual-note\n",
        )
        .unwrap();

        ledger.upsert("new.zip", "L9").unwrap();

        let content = fs::read_to_string(ledger.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec!["a.zip,L1", "only-a-name.zip", "c.zip,L3,manual-note", "new.zip,L9"]
        );
    }

    #[test]
    fn test_upsert_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());

        ledger.upsert("report.zip", "https://filebin.net/abc").unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(leftovers, vec!["output.csv"]);
    }

    #[test]
    fn test_records_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger_in(dir.path());
        assert!(ledger.records().unwrap().is_empty());
    }
}
