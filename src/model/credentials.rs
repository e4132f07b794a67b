//! 访问凭据
//!
//! 令牌从进程环境变量读取（启动时会先加载可选的 .env 文件），
//! 以显式结构体传入报表客户端，不使用全局状态。

use std::fmt;

use super::error::ConfigError;

/// 报表 API 访问凭据
#[derive(Clone)]
pub struct Credentials {
    access_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(ConfigError::Invalid {
                field: "accessToken",
                reason: "令牌为空".to_string(),
            });
        }
        Ok(Self { access_token })
    }

    /// 从环境变量读取令牌，缺失或为空时返回致命配置错误
    pub fn from_env(var_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(var_name, |name| std::env::var(name).ok())
    }

    /// 通过任意键值查找函数读取令牌
    pub fn from_lookup<F>(var_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(var_name) {
            Some(token) if !token.trim().is_empty() => Self::new(token),
            _ => Err(ConfigError::MissingCredential(var_name.to_string())),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"***")
            .finish()
    }
}
