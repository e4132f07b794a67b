//! 报表查询
//!
//! 描述单个 (实体, 日期窗口) 的请求，并负责序列化为 API 查询参数

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::window::MAX_WINDOW_DAYS;
use crate::model::ConfigError;

/// 报表时间粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// 按天拆分，最长 30 天
    Day,
    /// 按小时拆分，只能查询单个自然日
    Hour,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Hour => "hour",
        }
    }

    /// 校验日期范围是否满足粒度约束
    pub fn check_range(&self, start: NaiveDate, end: NaiveDate) -> Result<(), ConfigError> {
        if start > end {
            return Err(ConfigError::InvertedRange { start, end });
        }
        let days = (end - start).num_days() + 1;
        let reason = match self {
            Self::Hour if days != 1 => Some("按小时报表只能查询单日".to_string()),
            Self::Day if days > MAX_WINDOW_DAYS as i64 => Some(format!(
                "按天报表最多 {} 天，当前 {} 天",
                MAX_WINDOW_DAYS, days
            )),
            _ => None,
        };
        match reason {
            Some(reason) => Err(ConfigError::Granularity {
                granularity: self.as_str(),
                start,
                end,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// 单次报表查询
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub entity_id: String,
    pub secondary_entity_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub granularity: Granularity,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub filters: Map<String, Value>,
    pub page: u32,
    pub page_size: u32,
    pub include_totals: bool,
}

impl ReportQuery {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entity_id.trim().is_empty() {
            return Err(ConfigError::Missing("advertiserIds"));
        }
        if self.page == 0 || self.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "page",
                reason: format!("page={} page_size={}", self.page, self.page_size),
            });
        }
        self.granularity.check_range(self.start_date, self.end_date)
    }

    /// 返回指定页码的查询副本
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// 序列化为查询参数
    ///
    /// 列表和过滤条件以 JSON 字符串传递；过滤条件为空时不发送 filtering，
    /// 未请求汇总时不发送 enable_total_metrics。
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("advertiser_id", self.entity_id.clone())];
        if let Some(secondary) = &self.secondary_entity_id {
            params.push(("store_ids", Value::from(vec![secondary.clone()]).to_string()));
        }
        params.push(("start_date", self.start_date.format("%Y-%m-%d").to_string()));
        params.push(("end_date", self.end_date.format("%Y-%m-%d").to_string()));
        params.push(("dimensions", Value::from(self.dimensions.clone()).to_string()));
        params.push(("metrics", Value::from(self.metrics.clone()).to_string()));
        if !self.filters.is_empty() {
            params.push(("filtering", Value::Object(self.filters.clone()).to_string()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("page_size", self.page_size.to_string()));
        if self.include_totals {
            params.push(("enable_total_metrics", "true".to_string()));
        }
        params
    }
}
