//! 报表 API 客户端
//!
//! Input: ReportQuery、访问凭据
//! Output: ReportPage
//! Pos: 唯一的网络出口，一次只发出一个请求

use reqwest::Client;

use super::error::ReportError;
use super::query::ReportQuery;
use super::types::{ApiEnvelope, ReportPage};
use crate::http_client::{ProxyConfig, build_client};
use crate::model::{Config, Credentials};

/// 报表数据源
///
/// 拉取单页数据；分页循环由 fetcher 负责
#[allow(async_fn_in_trait)]
pub trait ReportSource {
    async fn fetch_page(&self, query: &ReportQuery) -> Result<ReportPage, ReportError>;
}

/// 基于 reqwest 的报表客户端
pub struct ReportClient {
    client: Client,
    url: String,
    credentials: Credentials,
}

impl ReportClient {
    /// 根据配置创建客户端（代理、超时、TLS 后端）
    pub fn new(config: &Config, credentials: Credentials) -> anyhow::Result<Self> {
        let proxy = ProxyConfig::from_config(config);
        let client = build_client(proxy.as_ref(), config.timeout_secs, config.tls_backend)?;
        Ok(Self::with_client(client, config.report_url(), credentials))
    }

    pub fn with_client(client: Client, url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }
}

impl ReportSource for ReportClient {
    async fn fetch_page(&self, query: &ReportQuery) -> Result<ReportPage, ReportError> {
        let response = self
            .client
            .get(&self.url)
            .header("Access-Token", self.credentials.access_token())
            .query(&query.to_params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(
                "报表请求失败: HTTP {} (advertiser={}, page={})",
                status,
                query.entity_id,
                query.page
            );
            return Err(ReportError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope = serde_json::from_str(&body)?;
        if envelope.code != 0 {
            tracing::warn!(
                "报表接口返回错误: code={} message={} request_id={}",
                envelope.code,
                envelope.message,
                envelope.request_id.as_deref().unwrap_or("-")
            );
            return Err(ReportError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }

        Ok(ReportPage::from_data(
            envelope.data.unwrap_or_default(),
            query.page,
        ))
    }
}
