//! 离散状态事件检测
//!
//! 固定的小字段集合（状态文本、最近转换原因）：与按设备持久化的
//! 上次已见值比较，值变化且非空时追加事件并更新已见值；空值或
//! 未变化不产生事件。事件列表在每次追加后裁剪到容量上限。

use domain::report::fields;
use domain::{EventKind, RawReport, UpsEvent};
use std::sync::Arc;
use upsmon_storage::{KvStore, StorageError, keys};

/// 事件列表容量。
pub const MAX_EVENTS: i64 = 100;

/// 事件检测器。
pub struct EventDetector {
    kv: Arc<dyn KvStore>,
}

impl EventDetector {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// 对本周期报文做一遍变化检测，返回新追加的事件。
    pub async fn observe(
        &self,
        device: &str,
        report: &RawReport,
        ts: i64,
    ) -> Result<Vec<UpsEvent>, StorageError> {
        let mut events = Vec::new();

        let status_now = report.get(fields::STATUS).unwrap_or("").to_uppercase();
        if !status_now.is_empty() {
            let status_key = keys::status_last(device);
            let previous = self.kv.get(&status_key).await?;
            if previous.as_deref() != Some(status_now.as_str()) {
                self.kv.set(&status_key, &status_now).await?;
                events.push(UpsEvent::new(ts, EventKind::Status, status_now));
            }
        }

        let lastxfer_now = report.get(fields::LASTXFER).unwrap_or("").trim().to_string();
        if !lastxfer_now.is_empty() {
            let lastxfer_key = keys::lastxfer_last(device);
            let previous = self.kv.get(&lastxfer_key).await?;
            if previous.as_deref() != Some(lastxfer_now.as_str()) {
                self.kv.set(&lastxfer_key, &lastxfer_now).await?;
                events.push(UpsEvent::new(ts, EventKind::Transfer, lastxfer_now));
            }
        }

        if !events.is_empty() {
            let list_key = keys::event_list(device);
            let lines: Vec<String> = events.iter().map(UpsEvent::to_line).collect();
            self.kv.lpush(&list_key, &lines).await?;
            self.kv.ltrim(&list_key, 0, MAX_EVENTS - 1).await?;
        }
        Ok(events)
    }

    /// 读取设备的最近事件（最新在前），跳过无法解码的条目。
    pub async fn recent_events(
        &self,
        device: &str,
        limit: i64,
    ) -> Result<Vec<UpsEvent>, StorageError> {
        let raw = self
            .kv
            .lrange(&keys::event_list(device), 0, limit.max(1) - 1)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|line| UpsEvent::parse_line(line))
            .collect())
    }
}
