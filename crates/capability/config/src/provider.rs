//! 设备注册表提供者
//!
//! 机群配置以单个 JSON 文档存于 `ups:config:json`。提供者持有一份
//! 进程内缓存，每次成功写入后显式失效并递增版本号，供变更观察方
//! （如 SSE 推送）感知；读取方通过依赖注入共享同一实例，不存在
//! 环境级全局状态。

use crate::ConfigError;
use domain::{DeviceConfig, DeviceUpdate, MonitorConfig, SmtpSettings};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::info;
use upsmon_storage::{KvStore, keys};

/// 缓存式配置提供者。
pub struct ConfigProvider {
    kv: Arc<dyn KvStore>,
    cache: RwLock<Option<Arc<MonitorConfig>>>,
    version: AtomicU64,
    /// 读-改-写序列的互斥段（见 config CRUD）。
    write_lock: Mutex<()>,
}

impl ConfigProvider {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            cache: RwLock::new(None),
            version: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// 当前配置（命中缓存或从存储加载）。
    ///
    /// 文档缺失时写入空脚手架；文档损坏返回 [`ConfigError::Malformed`]，
    /// 不影响已在运行的轮询任务。
    pub async fn current(&self) -> Result<Arc<MonitorConfig>, ConfigError> {
        if let Some(cached) = self
            .cache
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
        {
            return Ok(cached);
        }

        let raw = self
            .kv
            .get(keys::CONFIG_DOC)
            .await
            .map_err(|err| ConfigError::Storage(err.to_string()))?;
        let config = match raw {
            Some(raw) => {
                let parsed: MonitorConfig = serde_json::from_str(&raw)
                    .map_err(|err| ConfigError::Malformed(err.to_string()))?;
                validate_config(&parsed)?;
                Arc::new(parsed)
            }
            None => {
                let empty = MonitorConfig::empty();
                self.write_document(&empty).await?;
                info!(target: "upsmon.config", "config document missing, wrote empty scaffold");
                Arc::new(empty)
            }
        };

        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(config.clone());
        }
        Ok(config)
    }

    /// 校验并整体写入配置文档，随后失效缓存、递增版本号。
    pub async fn save(&self, config: MonitorConfig) -> Result<(), ConfigError> {
        validate_config(&config)?;
        self.write_document(&config).await?;
        self.invalidate();
        info!(
            target: "upsmon.config",
            devices = config.devices.len(),
            version = self.version(),
            "config document saved"
        );
        Ok(())
    }

    /// 显式失效缓存（写入成功后调用）。
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
        self.version.fetch_add(1, Ordering::Relaxed);
    }

    /// 配置版本号：每次成功写入后递增。
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    /// 新增设备；同名设备已存在时拒绝。
    pub async fn add_device(&self, device: DeviceConfig) -> Result<(), ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = (*self.current().await?).clone();
        if config.device(&device.name).is_some() {
            return Err(ConfigError::DuplicateDevice(device.name));
        }
        config.devices.push(device);
        self.save(config).await
    }

    /// 更新既有设备的部分字段；设备不存在返回 Ok(false)。
    pub async fn update_device(
        &self,
        name: &str,
        update: DeviceUpdate,
    ) -> Result<bool, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = (*self.current().await?).clone();
        let Some(device) = config.devices.iter_mut().find(|device| device.name == name) else {
            return Ok(false);
        };
        if let Some(host) = update.host {
            device.host = host;
        }
        if let Some(port) = update.port {
            device.port = port;
        }
        if let Some(interval_seconds) = update.interval_seconds {
            device.interval_seconds = interval_seconds;
        }
        if let Some(value) = update.alert_loadpct_high {
            device.alert_loadpct_high = Some(value);
        }
        if let Some(value) = update.alert_bcharge_low {
            device.alert_bcharge_low = Some(value);
        }
        if let Some(value) = update.alert_on_battery {
            device.alert_on_battery = value;
        }
        if let Some(value) = update.alert_runtime_low_minutes {
            device.alert_runtime_low_minutes = Some(value);
        }
        self.save(config).await?;
        Ok(true)
    }

    /// 删除设备；设备不存在返回 Ok(false)。
    pub async fn remove_device(&self, name: &str) -> Result<bool, ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = (*self.current().await?).clone();
        let before = config.devices.len();
        config.devices.retain(|device| device.name != name);
        if config.devices.len() == before {
            return Ok(false);
        }
        self.save(config).await?;
        Ok(true)
    }

    /// 更新（或清除）SMTP 投递参数。
    pub async fn set_smtp(&self, smtp: Option<SmtpSettings>) -> Result<(), ConfigError> {
        let _guard = self.write_lock.lock().await;
        let mut config = (*self.current().await?).clone();
        config.smtp = smtp;
        self.save(config).await
    }

    async fn write_document(&self, config: &MonitorConfig) -> Result<(), ConfigError> {
        let payload = serde_json::to_string(config)
            .map_err(|err| ConfigError::Malformed(err.to_string()))?;
        self.kv
            .set(keys::CONFIG_DOC, &payload)
            .await
            .map_err(|err| ConfigError::Storage(err.to_string()))
    }
}

/// 校验配置文档：设备名唯一非空、地址端口与间隔有效。
fn validate_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    for (index, device) in config.devices.iter().enumerate() {
        if device.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                format!("ups[{}].name", index),
                device.name.clone(),
            ));
        }
        if device.host.trim().is_empty() {
            return Err(ConfigError::Invalid(
                format!("ups[{}].host", index),
                device.host.clone(),
            ));
        }
        if device.port == 0 {
            return Err(ConfigError::Invalid(
                format!("ups[{}].port", index),
                device.port.to_string(),
            ));
        }
        if device.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                format!("ups[{}].interval_seconds", index),
                device.interval_seconds.to_string(),
            ));
        }
        if config.devices[..index]
            .iter()
            .any(|other| other.name == device.name)
        {
            return Err(ConfigError::DuplicateDevice(device.name.clone()));
        }
    }
    Ok(())
}
