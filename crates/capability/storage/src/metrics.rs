//! 指标存储：按设备的最新快照与有界历史时序。
//!
//! 快照与历史条目在同一原子批次内落库：最新快照哈希整体覆盖、
//! 历史列表追加一条并按长度上限裁剪，三者要么全部生效要么全部不生效。
//! 保留窗口裁剪（按时间）由监督任务周期性触发。

use crate::error::StorageError;
use crate::keys;
use crate::kv::{KvOp, KvStore};
use domain::report::fields;
use domain::{HistoryEntry, RawReport, Snapshot};
use std::sync::Arc;

/// 历史保留窗口（7 天）。
pub const RETENTION_SECONDS: i64 = 7 * 24 * 3600;

/// 历史长度上限：按最坏 30 秒间隔估算 7 天的条目数。
pub const MAX_HISTORY_ENTRIES: i64 = 7 * 24 * 60 * 2;

/// 指标存储。
#[derive(Clone)]
pub struct MetricStore {
    kv: Arc<dyn KvStore>,
    retention_seconds: i64,
    max_entries: i64,
}

impl MetricStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_limits(kv, RETENTION_SECONDS, MAX_HISTORY_ENTRIES)
    }

    /// 自定义保留窗口与长度上限（测试用）。
    pub fn with_limits(kv: Arc<dyn KvStore>, retention_seconds: i64, max_entries: i64) -> Self {
        Self {
            kv,
            retention_seconds,
            max_entries: max_entries.max(1),
        }
    }

    /// 原子替换最新快照并追加一条历史（随写裁剪到长度上限）。
    pub async fn store_snapshot(
        &self,
        device: &str,
        report: &RawReport,
        ts: i64,
    ) -> Result<(), StorageError> {
        let snap_key = keys::snapshot(device);
        let hist_key = keys::history(device);
        let mut snapshot_fields: Vec<(String, String)> = report
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        snapshot_fields.push((fields::INGESTED_AT.to_string(), ts.to_string()));
        let entry = HistoryEntry {
            ts,
            data: report.clone(),
        };
        let payload = serde_json::to_string(&entry)?;
        self.kv
            .multi(&[
                // 整体覆盖：先删除再写入，避免上一周期残留字段
                KvOp::Del {
                    key: snap_key.clone(),
                },
                KvOp::HSetAll {
                    key: snap_key,
                    fields: snapshot_fields,
                },
                KvOp::RPush {
                    key: hist_key.clone(),
                    value: payload,
                },
                KvOp::LTrim {
                    key: hist_key,
                    start: -self.max_entries,
                    stop: -1,
                },
            ])
            .await
    }

    /// 读取最新快照；从未成功写入过则返回 None。
    pub async fn get_latest(&self, device: &str) -> Result<Option<Snapshot>, StorageError> {
        let hash = self.kv.hgetall(&keys::snapshot(device)).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        let ts = hash
            .get(fields::INGESTED_AT)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0);
        let report: RawReport = hash
            .into_iter()
            .filter(|(field, _)| field != fields::INGESTED_AT)
            .collect();
        Ok(Some(Snapshot { report, ts }))
    }

    /// 按时间窗口读取历史，保持存储顺序；无法解码的条目跳过。
    pub async fn get_history(
        &self,
        device: &str,
        max_age_seconds: i64,
        now: i64,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let raw = self.kv.lrange(&keys::history(device), 0, -1).await?;
        Ok(raw
            .iter()
            .filter_map(|item| serde_json::from_str::<HistoryEntry>(item).ok())
            .filter(|entry| now - entry.ts <= max_age_seconds)
            .collect())
    }

    /// 裁剪所有设备的历史：从最老端弹出窗口外条目，遇到第一条窗口内
    /// 条目即停（时间戳单调假设）。返回删除的条目总数。
    pub async fn prune_old(&self, now: i64) -> Result<u64, StorageError> {
        let cutoff = now - self.retention_seconds;
        let mut removed: u64 = 0;
        for key in self.kv.scan_prefix(keys::HISTORY_PREFIX).await? {
            loop {
                let Some(head) = self.kv.lindex(&key, 0).await? else {
                    break;
                };
                match serde_json::from_str::<HistoryEntry>(&head) {
                    Ok(entry) if entry.ts < cutoff => {
                        self.kv.lpop(&key).await?;
                        removed += 1;
                    }
                    Ok(_) => break,
                    // 无法解码的队头条目一并清除
                    Err(_) => {
                        self.kv.lpop(&key).await?;
                        removed += 1;
                    }
                }
            }
        }
        Ok(removed)
    }
}
