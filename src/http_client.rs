//! HTTP Client 构建模块
//!
//! Input: 代理配置、超时、TLS 后端
//! Output: reqwest::Client
//! Pos: 报表 API 请求使用的 HTTP 客户端

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// 代理地址，支持 http://、https://、socks5://
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// 从应用配置中提取代理配置，未配置代理时返回 None
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.proxy_url.as_deref()?.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            username: config.proxy_username.clone(),
            password: config.proxy_password.clone(),
        })
    }
}

/// 构建 HTTP Client
///
/// # Arguments
/// * `proxy` - 可选的代理配置，支持格式:
///   - http://host:port
///   - socks5://host:port
///   - 用户名/密码单独配置时使用 basic auth
/// * `timeout_secs` - 单次请求超时时间（秒）
/// * `tls_backend` - TLS 实现
pub fn build_client(
    proxy: Option<&ProxyConfig>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("adreport-rs/", env!("CARGO_PKG_VERSION")));

    builder = match tls_backend {
        TlsBackend::Rustls => builder.use_rustls_tls(),
        #[cfg(feature = "native-tls")]
        TlsBackend::NativeTls => builder.use_native_tls(),
        #[cfg(not(feature = "native-tls"))]
        TlsBackend::NativeTls => {
            anyhow::bail!("当前构建未启用 native-tls 特性，请改用 rustls")
        }
    };

    if let Some(proxy) = proxy {
        let mut p = Proxy::all(&proxy.url)?;
        if let (Some(username), Some(password)) = (&proxy.username, &proxy.password) {
            p = p.basic_auth(username, password);
        }
        builder = builder.proxy(p);
        tracing::debug!("HTTP Client 使用代理: {}", proxy.url);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_without_proxy() {
        let client = build_client(None, 30, TlsBackend::Rustls);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_client_with_socks5_proxy() {
        let proxy = ProxyConfig {
            url: "socks5://127.0.0.1:1080".to_string(),
            username: None,
            password: None,
        };
        assert!(build_client(Some(&proxy), 30, TlsBackend::Rustls).is_ok());
    }

    #[test]
    fn test_build_client_with_auth_proxy() {
        let proxy = ProxyConfig {
            url: "http://127.0.0.1:7890".to_string(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
        };
        assert!(build_client(Some(&proxy), 30, TlsBackend::Rustls).is_ok());
    }

    #[test]
    fn test_proxy_config_from_config() {
        let mut config = Config::default();
        assert!(ProxyConfig::from_config(&config).is_none());

        config.proxy_url = Some("  ".to_string());
        assert!(ProxyConfig::from_config(&config).is_none());

        config.proxy_url = Some("http://127.0.0.1:7890".to_string());
        config.proxy_username = Some("u".to_string());
        let proxy = ProxyConfig::from_config(&config).unwrap();
        assert_eq!(proxy.url, "http://127.0.0.1:7890");
        assert_eq!(proxy.username.as_deref(), Some("u"));
        assert!(proxy.password.is_none());
    }
}
