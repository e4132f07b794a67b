//! 内存输出（测试用）

use std::collections::HashMap;

use anyhow::{Result, bail};

use super::{ERROR_LOG_COLUMNS, ErrorLogEntry, Sink};
use crate::report::flatten::FlatRow;

/// 以 "表头 + 数据行" 的二维文本保存每个输出目标
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tables: HashMap<String, Vec<Vec<String>>>,
    /// 为 true 时 append_error 返回错误
    pub fail_error_log: bool,
}

impl MemorySink {
    pub fn table(&self, destination: &str) -> Option<&Vec<Vec<String>>> {
        self.tables.get(destination)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Sink for MemorySink {
    fn write_table(&mut self, destination: &str, columns: &[&str], rows: &[FlatRow]) -> Result<()> {
        let mut table = vec![columns.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        table.extend(
            rows.iter()
                .map(|row| columns.iter().map(|c| row.get(c).to_string()).collect()),
        );
        self.tables.insert(destination.to_string(), table);
        Ok(())
    }

    fn write_totals(&mut self, destination: &str, totals: &[(String, String)]) -> Result<()> {
        let keys = totals.iter().map(|(k, _)| k.clone()).collect();
        let values = totals.iter().map(|(_, v)| v.clone()).collect();
        self.tables.insert(destination.to_string(), vec![keys, values]);
        Ok(())
    }

    fn append_error(&mut self, destination: &str, entry: &ErrorLogEntry) -> Result<()> {
        if self.fail_error_log {
            bail!("错误日志不可写");
        }
        let table = self.tables.entry(destination.to_string()).or_insert_with(|| {
            vec![ERROR_LOG_COLUMNS.iter().map(|c| c.to_string()).collect()]
        });
        table.push(entry.values().to_vec());
        Ok(())
    }

    fn remove(&mut self, destination: &str) -> Result<()> {
        self.tables.remove(destination);
        Ok(())
    }
}
