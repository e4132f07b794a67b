//! 报表 API 响应类型

use serde::Deserialize;
use serde_json::{Map, Value};

/// 响应信封
///
/// `code == 0` 表示成功，其余为业务错误
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub data: Option<ReportData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub list: Vec<ReportItem>,
    #[serde(default)]
    pub page_info: PageInfo,
    /// 整个查询（而非单页）的汇总指标
    #[serde(default, alias = "totals")]
    pub total_metrics: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInfo {
    /// 缺失时视为请求的页码
    #[serde(default, alias = "current_page")]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_page: u32,
}

/// 单条报表记录：维度与指标分别存放
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportItem {
    #[serde(default)]
    pub dimensions: Map<String, Value>,
    #[serde(default)]
    pub metrics: Map<String, Value>,
}

/// 一页报表数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub items: Vec<ReportItem>,
    pub current_page: u32,
    pub total_pages: u32,
    pub totals: Option<Map<String, Value>>,
}

impl ReportPage {
    /// 是否为最后一页
    pub fn is_last(&self) -> bool {
        self.current_page >= self.total_pages
    }

    /// 由响应数据构造，响应未给出页码时使用请求的页码
    pub fn from_data(data: ReportData, requested_page: u32) -> Self {
        Self {
            items: data.list,
            current_page: data.page_info.page.unwrap_or(requested_page),
            total_pages: data.page_info.total_page,
            totals: data.total_metrics,
        }
    }
}
