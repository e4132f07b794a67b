//! 表格输出
//!
//! Input: 扁平行、汇总记录、错误日志
//! Output: CSV 文件或 SQLite 表
//! Pos: 报表结果的唯一写出位置
//!
//! # 约定
//! - `write_table` / `write_totals` 整体覆盖目标内容
//! - `append_error` 只追加，首次写入时创建表头
//! - `remove` 删除目标，目标不存在时不报错

mod csv_dir;
#[cfg(test)]
pub mod memory;
mod sqlite;

pub use csv_dir::CsvSink;
pub use sqlite::SqliteSink;

use anyhow::Result;
use chrono::NaiveDate;

use crate::model::Config;
use crate::model::config::SinkBackend;
use crate::report::flatten::FlatRow;

/// 错误日志列
pub const ERROR_LOG_COLUMNS: [&str; 7] = [
    "logged_at",
    "run_id",
    "primary_id",
    "secondary_id",
    "window_start",
    "window_end",
    "message",
];

/// 批量拉取中单个 (窗口, 实体) 组合的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    pub logged_at: String,
    pub run_id: String,
    pub primary_id: String,
    pub secondary_id: Option<String>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub message: String,
}

impl ErrorLogEntry {
    /// 按 `ERROR_LOG_COLUMNS` 顺序输出
    pub fn values(&self) -> [String; 7] {
        [
            self.logged_at.clone(),
            self.run_id.clone(),
            self.primary_id.clone(),
            self.secondary_id.clone().unwrap_or_default(),
            self.window_start.format("%Y-%m-%d").to_string(),
            self.window_end.format("%Y-%m-%d").to_string(),
            self.message.clone(),
        ]
    }
}

/// 表格输出目标
pub trait Sink {
    /// 以表头 + 数据行覆盖目标，缺失的列写为空字符串
    fn write_table(&mut self, destination: &str, columns: &[&str], rows: &[FlatRow]) -> Result<()>;

    /// 以 (键行, 值行) 两行表覆盖目标
    fn write_totals(&mut self, destination: &str, totals: &[(String, String)]) -> Result<()>;

    /// 追加一行错误日志
    fn append_error(&mut self, destination: &str, entry: &ErrorLogEntry) -> Result<()>;

    /// 删除目标（用于清除上一次运行遗留的汇总）
    fn remove(&mut self, destination: &str) -> Result<()>;
}

/// 根据配置打开输出后端
pub fn open_sink(config: &Config) -> Result<Box<dyn Sink>> {
    let sink: Box<dyn Sink> = match config.sink_backend {
        SinkBackend::Csv => Box::new(CsvSink::new(&config.output_path)?),
        SinkBackend::Sqlite => Box::new(SqliteSink::open(&config.output_path)?),
    };
    tracing::info!(
        "输出后端: {:?} -> {}",
        config.sink_backend,
        config.output_path
    );
    Ok(sink)
}

/// 将输出目标名清理为安全的文件名/表名
pub(crate) fn sanitize_name(destination: &str) -> String {
    let safe: String = destination
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if safe.is_empty() { "_".to_string() } else { safe }
}
