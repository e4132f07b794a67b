//! 日期窗口规划
//!
//! 将较长的日期范围切分为不超过 API 最大跨度的连续窗口

use chrono::{Days, NaiveDate};

use crate::model::ConfigError;

/// API 允许的按天报表最大跨度（天，含首尾）
pub const MAX_WINDOW_DAYS: u64 = 30;

/// 日期窗口（首尾均含）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// 窗口包含的天数
    #[cfg(test)]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// 切分日期范围
///
/// 每个窗口结束于 `min(end, 窗口起点 + max_days - 1)`，下一个窗口从次日开始。
/// 开始日期晚于结束日期时返回配置错误。
pub fn plan_windows(
    start: NaiveDate,
    end: NaiveDate,
    max_days: u64,
) -> Result<Vec<Window>, ConfigError> {
    if start > end {
        return Err(ConfigError::InvertedRange { start, end });
    }
    if max_days == 0 {
        return Err(ConfigError::Invalid {
            field: "maxWindowDays",
            reason: "必须大于 0".to_string(),
        });
    }

    let mut windows = Vec::new();
    let mut cursor = start;
    loop {
        let window_end = cursor
            .checked_add_days(Days::new(max_days - 1))
            .map_or(end, |d| d.min(end));
        windows.push(Window::new(cursor, window_end));

        if window_end >= end {
            break;
        }
        cursor = match window_end.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    tracing::debug!(
        "日期范围 {} ~ {} 切分为 {} 个窗口",
        start,
        end,
        windows.len()
    );
    Ok(windows)
}
