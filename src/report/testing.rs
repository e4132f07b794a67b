//! 测试辅助：可编排的数据源与样例数据

use std::sync::Mutex;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::client::ReportSource;
use super::error::ReportError;
use super::query::{Granularity, ReportQuery};
use super::types::{ReportItem, ReportPage};

/// 按查询内容返回预设结果的数据源，并记录每次请求
pub struct ScriptedSource<F> {
    respond: F,
    log: Mutex<Vec<ReportQuery>>,
}

impl<F> ScriptedSource<F>
where
    F: Fn(&ReportQuery) -> Result<ReportPage, ReportError>,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<ReportQuery> {
        self.log.lock().unwrap().clone()
    }
}

impl<F> ReportSource for ScriptedSource<F>
where
    F: Fn(&ReportQuery) -> Result<ReportPage, ReportError>,
{
    async fn fetch_page(&self, query: &ReportQuery) -> Result<ReportPage, ReportError> {
        self.log.lock().unwrap().push(query.clone());
        (self.respond)(query)
    }
}

fn to_map(fields: &[(&str, Value)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn item(dimensions: &[(&str, Value)], metrics: &[(&str, Value)]) -> ReportItem {
    ReportItem {
        dimensions: to_map(dimensions),
        metrics: to_map(metrics),
    }
}

pub fn page(items: Vec<ReportItem>, current: u32, total: u32, totals: Option<Value>) -> ReportPage {
    ReportPage {
        items,
        current_page: current,
        total_pages: total,
        totals: totals.and_then(|v| v.as_object().cloned()),
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn sample_query() -> ReportQuery {
    ReportQuery {
        entity_id: "101".to_string(),
        secondary_entity_id: None,
        start_date: day(2025, 6, 1),
        end_date: day(2025, 6, 7),
        granularity: Granularity::Day,
        dimensions: vec!["id".to_string()],
        metrics: vec!["cost".to_string()],
        filters: Map::new(),
        page: 1,
        page_size: 2,
        include_totals: true,
    }
}
