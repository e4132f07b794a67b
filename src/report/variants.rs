//! 报表定义
//!
//! 每种报表的维度、指标、输出列和输出目标均为声明式数据

use serde_json::{Map, Value};

use super::flatten::{Column, FieldSource};
use super::query::Granularity;
use crate::model::Config;

/// 报表种类（命令行参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportKind {
    /// 单账户按天的推广系列报表
    CampaignDaily,
    /// 单账户单日按小时的商品报表
    ProductHourly,
    /// 多账户、自固定日期起按 30 天窗口拉取的素材报表
    CreativeSince,
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 任一错误立即中止，不写出任何结果
    Single,
    /// 逐个 (窗口, 实体) 隔离错误，记录错误日志后继续
    Batch,
}

/// 报表定义
#[derive(Debug)]
pub struct ReportVariant {
    pub kind: ReportKind,
    pub mode: RunMode,
    pub granularity: Granularity,
    pub dimensions: &'static [&'static str],
    pub metrics: &'static [&'static str],
    pub columns: &'static [Column],
    /// 状态过滤字段名，配置了 statusFilter 时写入 filtering
    pub status_filter: Option<&'static str>,
    pub output: &'static str,
    pub totals_output: &'static str,
    pub error_output: Option<&'static str>,
}

impl ReportVariant {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn dimension_list(&self) -> Vec<String> {
        self.dimensions.iter().map(|s| s.to_string()).collect()
    }

    pub fn metric_list(&self) -> Vec<String> {
        self.metrics.iter().map(|s| s.to_string()).collect()
    }

    /// 组合过滤条件：先放 extraFilters，再用 statusFilter 覆盖状态字段
    pub fn filters(&self, config: &Config) -> Map<String, Value> {
        let mut filters = config.extra_filters.clone();
        if let Some(key) = self.status_filter {
            if !config.status_filter.is_empty() {
                filters.insert(key.to_string(), Value::from(config.status_filter.clone()));
            }
        }
        filters
    }
}

const CAMPAIGN_DAILY: ReportVariant = ReportVariant {
    kind: ReportKind::CampaignDaily,
    mode: RunMode::Single,
    granularity: Granularity::Day,
    dimensions: &["campaign_id", "stat_time_day"],
    metrics: &[
        "campaign_name",
        "operation_status",
        "cost",
        "net_cost",
        "orders",
        "cost_per_order",
        "gross_revenue",
        "roi",
        "currency",
    ],
    columns: &[
        Column::renamed("advertiser_id", FieldSource::Primary),
        Column::renamed("store_id", FieldSource::Secondary),
        Column::dimension("campaign_id"),
        Column::metric("campaign_name"),
        Column::renamed("date", FieldSource::Dimension("stat_time_day")),
        Column::metric("operation_status"),
        Column::metric("cost"),
        Column::metric("net_cost"),
        Column::metric("orders"),
        Column::metric("cost_per_order"),
        Column::metric("gross_revenue"),
        Column::metric("roi"),
        Column::metric("currency"),
    ],
    status_filter: Some("campaign_statuses"),
    output: "campaign_daily",
    totals_output: "campaign_daily_totals",
    error_output: None,
};

const PRODUCT_HOURLY: ReportVariant = ReportVariant {
    kind: ReportKind::ProductHourly,
    mode: RunMode::Single,
    granularity: Granularity::Hour,
    dimensions: &["item_group_id", "stat_time_hour"],
    metrics: &[
        "product_name",
        "product_status",
        "cost",
        "orders",
        "cost_per_order",
        "gross_revenue",
        "roi",
        "currency",
    ],
    columns: &[
        Column::renamed("advertiser_id", FieldSource::Primary),
        Column::renamed("store_id", FieldSource::Secondary),
        Column::renamed("product_id", FieldSource::Dimension("item_group_id")),
        Column::metric("product_name"),
        Column::renamed("hour", FieldSource::Dimension("stat_time_hour")),
        Column::metric("product_status"),
        Column::metric("cost"),
        Column::metric("orders"),
        Column::metric("cost_per_order"),
        Column::metric("gross_revenue"),
        Column::metric("roi"),
        Column::metric("currency"),
    ],
    status_filter: Some("product_statuses"),
    output: "product_hourly",
    totals_output: "product_hourly_totals",
    error_output: None,
};

const CREATIVE_SINCE: ReportVariant = ReportVariant {
    kind: ReportKind::CreativeSince,
    mode: RunMode::Batch,
    granularity: Granularity::Day,
    dimensions: &["item_id", "stat_time_day"],
    metrics: &[
        "title",
        "campaign_id",
        "cost",
        "net_cost",
        "orders",
        "cost_per_order",
        "gross_revenue",
        "roi",
        "product_impressions",
        "product_clicks",
        "ad_video_view",
        "10s_video_views",
        "currency",
    ],
    columns: &[
        Column::renamed("advertiser_id", FieldSource::Primary),
        Column::renamed("store_id", FieldSource::Secondary),
        Column::renamed("creative_id", FieldSource::Dimension("item_id")),
        Column::metric("title"),
        Column::metric("campaign_id"),
        Column::renamed("date", FieldSource::Dimension("stat_time_day")),
        Column::metric("cost"),
        Column::metric("net_cost"),
        Column::metric("orders"),
        Column::metric("cost_per_order"),
        Column::metric("gross_revenue"),
        Column::metric("roi"),
        Column::metric("product_impressions"),
        Column::metric("product_clicks"),
        Column::metric("ad_video_view"),
        Column::renamed("video_views_10s", FieldSource::Metric("10s_video_views")),
        Column::metric("currency"),
    ],
    status_filter: Some("creative_delivery_statuses"),
    output: "creative_since",
    totals_output: "creative_since_totals",
    error_output: Some("creative_since_errors"),
};

/// 全部报表定义
pub const VARIANTS: &[ReportVariant] = &[CAMPAIGN_DAILY, PRODUCT_HOURLY, CREATIVE_SINCE];

/// 查找报表定义
pub fn variant(kind: ReportKind) -> &'static ReportVariant {
    match kind {
        ReportKind::CampaignDaily => &VARIANTS[0],
        ReportKind::ProductHourly => &VARIANTS[1],
        ReportKind::CreativeSince => &VARIANTS[2],
    }
}
