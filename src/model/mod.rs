//! 配置与凭据模型

pub mod config;
pub mod credentials;
pub mod error;

pub use config::Config;
pub use credentials::Credentials;
pub use error::ConfigError;
