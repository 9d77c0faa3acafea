//! 告警能力
//!
//! 每个轮询周期对富化报文评估一遍规则：无状态阈值规则（按设备配置
//! 逐条可选）+ 两条全局开关的趋势规则。触发的消息先按 (设备, 消息)
//! 的内容摘要做冷却去重，新通过的消息立即记入冷却与最近告警日志，
//! 然后作为一个批次移交通知接收端；投递失败只记日志，冷却簿记不受
//! 影响（已提交，下个冷却窗口前不会重发同一消息）。

pub mod rules;
mod sink;

pub use sink::{NotificationSink, NotifyError, SmtpNotifier, TracingNotifier};

use domain::{DeviceConfig, RawReport, UiSettings};
use std::sync::Arc;
use tracing::{info, warn};
use upsmon_storage::{KvOp, KvStore, StorageError, keys};
use upsmon_telemetry::{
    record_alerts_suppressed, record_alerts_triggered, record_notification_failure,
    record_notification_sent,
};
use uuid::Uuid;

/// 同一 (设备, 消息) 的冷却窗口（30 分钟）。
pub const ALERT_COOLDOWN_SECONDS: u64 = 1800;

/// 最近告警日志容量。
pub const MAX_RECENT_ALERTS: i64 = 50;

/// (设备, 消息) 的稳定内容摘要，跨进程重启一致。
pub fn fingerprint(device_name: &str, message: &str) -> String {
    let content = format!("{}\n{}", device_name, message);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, content.as_bytes()).to_string()
}

/// 一次评估的结果。
#[derive(Debug, Clone, Default)]
pub struct AlertOutcome {
    /// 本周期触发的全部消息。
    pub triggered: Vec<String>,
    /// 通过冷却、已移交接收端的消息。
    pub sent: Vec<String>,
    /// 被冷却抑制的消息数。
    pub suppressed: usize,
}

/// 告警评估引擎。
pub struct AlertEngine {
    kv: Arc<dyn KvStore>,
    sink: Arc<dyn NotificationSink>,
}

impl AlertEngine {
    pub fn new(kv: Arc<dyn KvStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { kv, sink }
    }

    /// 评估本周期的全部规则并处理冷却与投递。
    pub async fn process(
        &self,
        device: &DeviceConfig,
        ui: &UiSettings,
        report: &RawReport,
        now: i64,
    ) -> Result<AlertOutcome, StorageError> {
        let mut triggered = rules::threshold_messages(device, report);
        if ui.enable_transfer_burst_alert
            && let Some(message) = rules::burst_message(self.kv.as_ref(), &device.name, now).await?
        {
            triggered.push(message);
        }
        if ui.enable_voltage_deviation_alert
            && let Some(message) =
                rules::voltage_deviation_message(self.kv.as_ref(), &device.name, report).await?
        {
            triggered.push(message);
        }
        if triggered.is_empty() {
            return Ok(AlertOutcome::default());
        }
        record_alerts_triggered(triggered.len() as u64);

        let mut to_send = Vec::new();
        let mut suppressed = 0usize;
        for message in &triggered {
            let cooldown_key =
                keys::alert_cooldown(&device.name, &fingerprint(&device.name, message));
            if self.kv.get(&cooldown_key).await?.is_none() {
                self.kv
                    .set_ex(&cooldown_key, &now.to_string(), ALERT_COOLDOWN_SECONDS)
                    .await?;
                to_send.push(message.clone());
            } else {
                suppressed += 1;
            }
        }
        record_alerts_suppressed(suppressed as u64);

        if !to_send.is_empty() {
            let recent_key = keys::recent_alerts(&device.name);
            let lines: Vec<String> = to_send
                .iter()
                .map(|message| format!("{}|{}", now, message))
                .collect();
            self.kv
                .multi(&[
                    KvOp::LPush {
                        key: recent_key.clone(),
                        values: lines,
                    },
                    KvOp::LTrim {
                        key: recent_key,
                        start: 0,
                        stop: MAX_RECENT_ALERTS - 1,
                    },
                ])
                .await?;

            match self.sink.send(&device.name, &to_send).await {
                Ok(()) => {
                    record_notification_sent();
                    info!(
                        target: "upsmon.alerts",
                        device = %device.name,
                        count = to_send.len(),
                        "alert batch handed off"
                    );
                }
                Err(err) => {
                    // 冷却与日志已提交；同一消息要到窗口过期才会重发
                    record_notification_failure();
                    warn!(
                        target: "upsmon.alerts",
                        device = %device.name,
                        error = %err,
                        "alert delivery failed"
                    );
                }
            }
        }

        Ok(AlertOutcome {
            triggered,
            sent: to_send,
            suppressed,
        })
    }

    /// 读取设备的最近告警日志（最新在前）。
    pub async fn recent_alerts(
        &self,
        device_name: &str,
    ) -> Result<Vec<(i64, String)>, StorageError> {
        let raw = self
            .kv
            .lrange(&keys::recent_alerts(device_name), 0, MAX_RECENT_ALERTS - 1)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|line| {
                let (ts, message) = line.split_once('|')?;
                Some((ts.parse::<i64>().ok()?, message.to_string()))
            })
            .collect())
    }

    /// 读取设备的电压偏差滚动样本（最新在前）。
    pub async fn voltage_samples(&self, device_name: &str) -> Result<Vec<f64>, StorageError> {
        let raw = self
            .kv
            .lrange(&keys::voltage_samples(device_name), 0, -1)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|sample| sample.parse::<f64>().ok())
            .collect())
    }
}
