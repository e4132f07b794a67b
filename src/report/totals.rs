//! 汇总累加
//!
//! 跨窗口、跨实体合并多次查询返回的汇总对象。数值字段求和，
//! 非数值字段先到先得；比率类指标不可直接相加，全部合并完成后
//! 由求和后的分子/分母重新计算。

use std::collections::HashMap;

use serde_json::{Map, Value};

/// 汇总字段值
#[derive(Debug, Clone, PartialEq)]
pub enum TotalValue {
    /// 累加中的数值
    Sum(f64),
    /// 从未出现过数值时原样保留的值（如币种）
    Carried(Value),
}

impl TotalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Sum(v) => Some(*v),
            Self::Carried(_) => None,
        }
    }

    /// 转换为输出单元格文本
    pub fn to_cell(&self) -> String {
        match self {
            Self::Sum(v) => format_number(*v),
            Self::Carried(Value::String(s)) => s.clone(),
            Self::Carried(Value::Null) => String::new(),
            Self::Carried(other) => other.to_string(),
        }
    }
}

/// 比率重算规则：`target = numerator / 第一个有效的分母`
#[derive(Debug, Clone, Copy)]
pub struct RatioRule {
    pub target: &'static str,
    pub numerator: &'static str,
    /// 依次尝试，取第一个有限且大于 0 的值
    pub denominators: &'static [&'static str],
}

/// 默认的比率重算规则
pub const RATIO_RULES: &[RatioRule] = &[
    RatioRule {
        target: "roi",
        numerator: "gross_revenue",
        denominators: &["cost", "net_cost"],
    },
    RatioRule {
        target: "cost_per_order",
        numerator: "cost",
        denominators: &["orders"],
    },
];

/// 汇总累加器，按键首次出现的顺序输出
#[derive(Debug, Default, Clone)]
pub struct TotalsAccumulator {
    order: Vec<String>,
    values: HashMap<String, TotalValue>,
}

impl TotalsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&TotalValue> {
        self.values.get(key)
    }

    /// 读取数值字段
    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(TotalValue::as_f64)
    }

    fn set(&mut self, key: &str, value: TotalValue) {
        if self.values.insert(key.to_string(), value).is_none() {
            self.order.push(key.to_string());
        }
    }

    /// 合并一个汇总对象
    ///
    /// - 可解析为数字：加到已有数值上（不存在或之前为保留值时从 0 开始）
    /// - 不可解析：仅当该键尚不存在时保留原值
    pub fn merge(&mut self, totals: &Map<String, Value>) {
        for (key, raw) in totals {
            match parse_number(raw) {
                Some(n) => {
                    let base = self.number(key).unwrap_or(0.0);
                    self.set(key, TotalValue::Sum(base + n));
                }
                None => {
                    if !self.values.contains_key(key) {
                        self.set(key, TotalValue::Carried(raw.clone()));
                    }
                }
            }
        }
    }

    /// 按默认规则重算比率
    pub fn finalize(&mut self) {
        self.recompute(RATIO_RULES);
    }

    /// 由求和后的分子/分母重算比率；没有有效分母时保持原值
    pub fn recompute(&mut self, rules: &[RatioRule]) {
        for rule in rules {
            let Some(numerator) = self.number(rule.numerator).filter(|v| v.is_finite()) else {
                continue;
            };
            let denominator = rule
                .denominators
                .iter()
                .filter_map(|key| self.number(key))
                .find(|v| v.is_finite() && *v > 0.0);
            if let Some(denominator) = denominator {
                self.set(rule.target, TotalValue::Sum(numerator / denominator));
            }
        }
    }

    /// 按键顺序导出 (列名, 文本值)
    pub fn to_record(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|key| self.values.get(key).map(|v| (key.clone(), v.to_cell())))
            .collect()
    }
}

/// 解析数值：JSON 数字或形如数字的字符串
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// 格式化数值：最多 6 位小数，去掉末尾多余的 0
pub fn format_number(v: f64) -> String {
    let s = format!("{:.6}", v);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
