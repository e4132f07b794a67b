//! 行展开
//!
//! 将 `{dimensions, metrics}` 记录按输出列定义展开为扁平行。
//! 缺失字段一律写为空字符串，保证输出列类型稳定。

use std::collections::HashMap;

use serde_json::Value;

use super::entity::EntityPair;
use super::types::ReportItem;

/// 输出列的取值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// 从 `dimensions` 中按键读取
    Dimension(&'static str),
    /// 从 `metrics` 中按键读取（键可以不是合法标识符，例如 `10s_video_views`）
    Metric(&'static str),
    /// 当前查询的主实体 ID
    Primary,
    /// 当前查询的次实体 ID
    Secondary,
}

/// 输出列定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub source: FieldSource,
}

impl Column {
    /// 维度列，输出列名与字段同名
    pub const fn dimension(name: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::Dimension(name),
        }
    }

    /// 指标列，输出列名与字段同名
    pub const fn metric(name: &'static str) -> Self {
        Self {
            name,
            source: FieldSource::Metric(name),
        }
    }

    /// 以 `name` 作为输出列名，读取 `source`
    pub const fn renamed(name: &'static str, source: FieldSource) -> Self {
        Self { name, source }
    }
}

/// 扁平输出行，创建后不再修改
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRow {
    fields: HashMap<String, String>,
}

impl FlatRow {
    /// 按列定义展开一条记录
    pub fn from_item(item: &ReportItem, columns: &[Column], pair: &EntityPair) -> Self {
        let fields = columns
            .iter()
            .map(|column| {
                let value = match column.source {
                    FieldSource::Dimension(key) => cell_value(item.dimensions.get(key)),
                    FieldSource::Metric(key) => cell_value(item.metrics.get(key)),
                    FieldSource::Primary => pair.primary.clone(),
                    FieldSource::Secondary => pair.secondary.clone().unwrap_or_default(),
                };
                (column.name.to_string(), value)
            })
            .collect();
        Self { fields }
    }

    /// 直接由 (列名, 值) 构造
    #[cfg(test)]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 读取列值，不存在的列返回空字符串
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// 将 JSON 值转换为单元格文本，缺失和 null 均为空字符串
pub fn cell_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// 展开一次查询的全部记录
pub fn flatten_items(items: &[ReportItem], columns: &[Column], pair: &EntityPair) -> Vec<FlatRow> {
    items
        .iter()
        .map(|item| FlatRow::from_item(item, columns, pair))
        .collect()
}
