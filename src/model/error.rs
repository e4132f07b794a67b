//! 配置错误类型

use chrono::NaiveDate;

/// 配置错误
///
/// 在发出任何网络请求之前触发，属于致命错误，不会重试
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 必填配置缺失
    #[error("缺少必填配置项: {0}")]
    Missing(&'static str),

    /// 配置值非法
    #[error("配置项 {field} 无效: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// 起始日期晚于结束日期
    #[error("日期范围无效: 开始日期 {start} 晚于结束日期 {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    /// 日期范围不满足报表粒度约束
    #[error("日期范围 {start} ~ {end} 不满足 {granularity} 粒度约束: {reason}")]
    Granularity {
        granularity: &'static str,
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    /// 主/次实体 ID 列表无法配对
    #[error("实体列表无法配对: 主实体 {primary} 个，次实体 {secondary} 个")]
    EntityMismatch { primary: usize, secondary: usize },

    /// 凭据缺失
    #[error("未找到访问凭据，请设置环境变量 {0}")]
    MissingCredential(String),

    /// 配置文件读取/解析失败
    #[error("读取配置文件 {path} 失败: {reason}")]
    Load { path: String, reason: String },
}
