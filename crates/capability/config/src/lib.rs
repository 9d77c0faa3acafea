//! 应用运行配置加载与设备注册表。

mod provider;

pub use provider::ConfigProvider;

use std::env;

/// 配置错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("malformed config document: {0}")]
    Malformed(String),
    #[error("device already exists: {0}")]
    DuplicateDevice(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// 应用运行配置（进程级，环境变量读取）。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub status_timeout_seconds: u64,
    pub apcaccess_bin: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let redis_url = env::var("UPSMON_REDIS_URL")
            .unwrap_or_else(|_| "redis://redis:6379/0".to_string());
        let status_timeout_seconds = read_u64_with_default("UPSMON_STATUS_TIMEOUT_SECONDS", 10)?;
        let apcaccess_bin =
            env::var("UPSMON_APCACCESS_BIN").unwrap_or_else(|_| "apcaccess".to_string());
        Ok(Self {
            redis_url,
            status_timeout_seconds,
            apcaccess_bin,
        })
    }
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
