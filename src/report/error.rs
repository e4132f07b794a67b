//! 报表拉取错误类型

use crate::common::truncate_with_ellipsis;
use crate::model::ConfigError;

/// 错误日志中响应体的最大长度
const MAX_BODY_BYTES: usize = 512;

/// 报表拉取错误
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTP 状态码非 2xx
    #[error("HTTP {status}: {}", truncate_with_ellipsis(.body, MAX_BODY_BYTES))]
    Transport { status: u16, body: String },

    /// 连接失败、超时等传输层错误
    #[error("请求发送失败: {0}")]
    Request(#[from] reqwest::Error),

    /// 响应信封中的 code 非 0
    #[error("API 错误 {code}: {message}")]
    Api { code: i64, message: String },

    /// 响应体无法解析
    #[error("响应解析失败: {0}")]
    Decode(#[from] serde_json::Error),

    /// 分页信息异常：页码不前进或页数超过上限
    #[error("分页异常 (第 {page} 页): {reason}")]
    Pagination { page: u32, reason: String },
}

impl ReportError {
    /// 是否为致命的配置错误
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
