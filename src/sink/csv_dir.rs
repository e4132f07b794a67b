//! CSV 目录输出：每个输出目标对应 `<dir>/<name>.csv`

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};

use super::{ERROR_LOG_COLUMNS, ErrorLogEntry, Sink, sanitize_name};
use crate::report::flatten::FlatRow;

pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// 创建输出目录（如不存在）
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("创建输出目录失败: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sanitize_name(destination)))
    }
}

impl Sink for CsvSink {
    fn write_table(&mut self, destination: &str, columns: &[&str], rows: &[FlatRow]) -> Result<()> {
        let path = self.path_for(destination);
        let mut wtr = Writer::from_path(&path)
            .with_context(|| format!("打开输出文件失败: {}", path.display()))?;

        wtr.write_record(columns)?;
        for row in rows {
            wtr.write_record(columns.iter().map(|c| row.get(c)))?;
        }
        wtr.flush()?;

        tracing::info!("已写出 {} 行到 {}", rows.len(), path.display());
        Ok(())
    }

    fn write_totals(&mut self, destination: &str, totals: &[(String, String)]) -> Result<()> {
        let path = self.path_for(destination);
        let mut wtr = Writer::from_path(&path)
            .with_context(|| format!("打开汇总文件失败: {}", path.display()))?;

        wtr.write_record(totals.iter().map(|(k, _)| k))?;
        wtr.write_record(totals.iter().map(|(_, v)| v))?;
        wtr.flush()?;

        tracing::info!("已写出汇总到 {}", path.display());
        Ok(())
    }

    fn append_error(&mut self, destination: &str, entry: &ErrorLogEntry) -> Result<()> {
        let path = self.path_for(destination);
        let has_header = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("打开错误日志失败: {}", path.display()))?;
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);

        if !has_header {
            wtr.write_record(ERROR_LOG_COLUMNS)?;
        }
        wtr.write_record(entry.values())?;
        wtr.flush()?;
        Ok(())
    }

    fn remove(&mut self, destination: &str) -> Result<()> {
        let path = self.path_for(destination);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("已删除 {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("删除输出文件失败: {}", path.display())),
        }
    }
}
