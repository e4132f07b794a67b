//! 广告报表拉取
//!
//! Input: 配置中的账户、日期范围与报表定义
//! Output: 扁平行与汇总记录，交由 sink 写出
//! Pos: 窗口切分 → 分页拉取 → 扁平化 → 汇总合并

pub mod client;
pub mod driver;
pub mod entity;
pub mod error;
pub mod fetcher;
pub mod flatten;
pub mod query;
#[cfg(test)]
pub(crate) mod testing;
pub mod totals;
pub mod types;
pub mod variants;
pub mod window;

pub use client::ReportClient;
pub use driver::{RunSummary, run_batch, run_single};
pub use variants::{ReportKind, RunMode, variant};
