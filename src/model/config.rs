use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::error::ConfigError;
use crate::common::split_list;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    Rustls,
    NativeTls,
}

impl Default for TlsBackend {
    fn default() -> Self {
        Self::Rustls
    }
}

/// 输出后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SinkBackend {
    /// 每个输出目标写入 `<outputPath>/<name>.csv`
    Csv,
    /// 所有输出目标写入同一个 SQLite 文件 `<outputPath>` 中的同名表
    Sqlite,
}

impl Default for SinkBackend {
    fn default() -> Self {
        Self::Csv
    }
}

/// 报表拉取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// API 基础地址，例如 https://ads.example.com/open_api/v1.3
    #[serde(default)]
    pub api_base_url: String,

    /// 报表接口路径
    #[serde(default = "default_report_path")]
    pub report_path: String,

    /// 主实体 ID 列表（广告账户），支持数组或逗号分隔字符串
    #[serde(default, deserialize_with = "deserialize_list")]
    pub advertiser_ids: Vec<String>,

    /// 次实体 ID 列表（店铺），单个值时广播到所有主实体
    #[serde(default, deserialize_with = "deserialize_list")]
    pub store_ids: Vec<String>,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// 结束日期（含），批量报表未配置时取当天
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// 是否请求并写出汇总行
    #[serde(default = "default_enable_totals")]
    pub enable_totals: bool,

    /// 状态过滤值列表，写入报表定义中的状态过滤字段
    #[serde(default, deserialize_with = "deserialize_list")]
    pub status_filter: Vec<String>,

    /// 额外的过滤条件，原样合并到 filtering 参数
    #[serde(default)]
    pub extra_filters: serde_json::Map<String, serde_json::Value>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// HTTP 代理地址（可选）
    /// 支持格式: http://host:port, https://host:port, socks5://host:port
    #[serde(default)]
    pub proxy_url: Option<String>,

    #[serde(default)]
    pub proxy_username: Option<String>,

    #[serde(default)]
    pub proxy_password: Option<String>,

    #[serde(default = "default_tls_backend")]
    pub tls_backend: TlsBackend,

    #[serde(default)]
    pub sink_backend: SinkBackend,

    /// CSV 输出目录或 SQLite 数据库文件路径
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// 存放访问令牌的环境变量名
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_report_path() -> String {
    "/report/get/".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_enable_totals() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_tls_backend() -> TlsBackend {
    TlsBackend::Rustls
}

fn default_output_path() -> String {
    "output".to_string()
}

fn default_access_token_env() -> String {
    "ADREPORT_ACCESS_TOKEN".to_string()
}

/// 最大分页大小（API 限制）
pub const MAX_PAGE_SIZE: u32 = 1000;

/// 列表字段既接受 JSON 数组，也接受逗号分隔字符串
fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<serde_json::Value>),
        Csv(String),
    }

    Ok(match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::Csv(s) => split_list(&s),
        ListOrCsv::List(items) => items
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.trim().to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            report_path: default_report_path(),
            advertiser_ids: Vec::new(),
            store_ids: Vec::new(),
            start_date: None,
            end_date: None,
            page_size: default_page_size(),
            enable_totals: default_enable_totals(),
            status_filter: Vec::new(),
            extra_filters: serde_json::Map::new(),
            timeout_secs: default_timeout_secs(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            tls_backend: default_tls_backend(),
            sink_backend: SinkBackend::default(),
            output_path: default_output_path(),
            access_token_env: default_access_token_env(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置，文件不存在时返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("配置文件 {} 不存在，使用默认配置", path.display());
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let load_err = |reason: String| ConfigError::Load {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let mut config: Config =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 完整的报表接口 URL
    pub fn report_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.report_path.trim_start_matches('/')
        )
    }

    /// 校验发起请求前必须满足的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Missing("apiBaseUrl"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "apiBaseUrl",
                reason: format!("不是 http(s) 地址: {}", self.api_base_url),
            });
        }
        if self.advertiser_ids.is_empty() {
            return Err(ConfigError::Missing("advertiserIds"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "pageSize",
                reason: format!("必须在 1..={} 之间，当前为 {}", MAX_PAGE_SIZE, self.page_size),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeoutSecs",
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
