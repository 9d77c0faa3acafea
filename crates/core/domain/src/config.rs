//! 配置文档模型
//!
//! 整个机群的配置以单个 JSON 文档持久化（`{"ups": [...], "smtp": ..., "ui": ...}`），
//! 由配置提供者读写；此处只定义文档结构与更新输入。

use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    3551
}

fn default_interval() -> u64 {
    30
}

fn default_subject_prefix() -> String {
    "[UPS]".to_string()
}

/// 单台 UPS 的监控配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 设备名（机群内唯一，键空间前缀）。
    pub name: String,
    /// apcupsd NIS 主机地址。
    pub host: String,
    /// apcupsd NIS 端口。
    #[serde(default = "default_port")]
    pub port: u16,
    /// 轮询间隔（秒）。
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// 负载百分比 ≥ 阈值时告警。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_loadpct_high: Option<f64>,
    /// 电池电量 ≤ 阈值时告警。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_bcharge_low: Option<f64>,
    /// 状态指示电池供电时告警。
    #[serde(default)]
    pub alert_on_battery: bool,
    /// 剩余运行分钟数 ≤ 阈值时告警。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_runtime_low_minutes: Option<f64>,
}

/// 设备配置更新输入（None 表示保持不变）。
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub interval_seconds: Option<u64>,
    pub alert_loadpct_high: Option<f64>,
    pub alert_bcharge_low: Option<f64>,
    pub alert_on_battery: Option<bool>,
    pub alert_runtime_low_minutes: Option<f64>,
}

/// SMTP 投递参数（投递实现属于外部协作者）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// 明文口令；缺省时投递端回退到 SMTP_PASSWORD 环境变量。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// STARTTLS。
    #[serde(default)]
    pub use_tls: bool,
    /// SMTPS（隐式 TLS）。
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_addr: Option<String>,
    #[serde(default)]
    pub to_addrs: Vec<String>,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

/// 界面与全局告警特性开关。
///
/// 核心只消费两个告警开关；其余字段随文档一起持久化，供仪表盘协作者读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub show_events: bool,
    pub show_energy: bool,
    pub color_badges: bool,
    pub show_headroom: bool,
    pub show_watts: bool,
    pub show_runtime: bool,
    pub allow_resize: bool,
    /// 全局开关：频繁切换电池（burst）趋势告警。
    pub enable_transfer_burst_alert: bool,
    /// 全局开关：电压偏差趋势告警。
    pub enable_voltage_deviation_alert: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            show_events: true,
            show_energy: false,
            color_badges: true,
            show_headroom: true,
            show_watts: true,
            show_runtime: true,
            allow_resize: true,
            enable_transfer_burst_alert: false,
            enable_voltage_deviation_alert: false,
        }
    }
}

/// 机群配置文档。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(rename = "ups", default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpSettings>,
    #[serde(default)]
    pub ui: UiSettings,
}

impl MonitorConfig {
    /// 空脚手架文档（首次启动时写入）。
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.name == name)
    }
}
