//! 能耗与功率聚合
//!
//! 本周期派生出瓦数时：向当日能耗计数累加 `watts × interval_seconds`
//! 并刷新其过期；分钟桶按日历分钟滚动，翻分钟时把上一桶定格为
//! 一条分钟平均功率时序（序列裁剪到一天的分钟数）。

use crate::poll::CycleStamp;
use domain::PowerSeriesEntry;
use std::sync::Arc;
use upsmon_storage::{KvStore, StorageError, keys};

/// 能耗计数过期时间（3 天）。
pub const ENERGY_TTL_SECONDS: u64 = 3 * 24 * 3600;

/// 分钟桶过期时间。
pub const MINUTE_BUCKET_TTL_SECONDS: u64 = 26 * 3600;

/// 功率时序容量（一天的分钟数）。
pub const MAX_POWER_SERIES_ENTRIES: i64 = 1440;

const FIELD_MINUTE: &str = "minute";
const FIELD_SUM: &str = "sum";
const FIELD_COUNT: &str = "count";

/// 能耗与功率聚合器。
pub struct EnergyAggregator {
    kv: Arc<dyn KvStore>,
}

impl EnergyAggregator {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// 记录本周期的功率样本。
    pub async fn record(
        &self,
        device: &str,
        watts: f64,
        interval_seconds: u64,
        stamp: &CycleStamp,
    ) -> Result<(), StorageError> {
        let energy_key = keys::energy(device, &stamp.day_id);
        self.kv
            .incr_by_float(&energy_key, watts * interval_seconds as f64)
            .await?;
        self.kv.expire(&energy_key, ENERGY_TTL_SECONDS).await?;

        let bucket_key = keys::minute_bucket(device);
        let bucket = self.kv.hgetall(&bucket_key).await?;
        let bucket_minute = bucket.get(FIELD_MINUTE).cloned();

        if bucket_minute.as_deref() != Some(stamp.minute_id.as_str()) {
            // 翻分钟：先把上一桶定格为一条时序；字段损坏的桶按过期桶丢弃
            if let Some(minute) = bucket_minute
                && let (Some(sum), Some(count)) = (bucket.get(FIELD_SUM), bucket.get(FIELD_COUNT))
                && let (Ok(sum), Ok(count)) = (sum.parse::<f64>(), count.parse::<i64>())
            {
                let entry = PowerSeriesEntry {
                    minute,
                    avg_watts: sum / count.max(1) as f64,
                };
                let series_key = keys::power_series(device);
                self.kv.lpush(&series_key, &[entry.to_line()]).await?;
                self.kv
                    .ltrim(&series_key, 0, MAX_POWER_SERIES_ENTRIES - 1)
                    .await?;
            }
            self.kv
                .hset_all(
                    &bucket_key,
                    &[
                        (FIELD_MINUTE.to_string(), stamp.minute_id.clone()),
                        (FIELD_SUM.to_string(), watts.to_string()),
                        (FIELD_COUNT.to_string(), "1".to_string()),
                    ],
                )
                .await?;
            self.kv
                .expire(&bucket_key, MINUTE_BUCKET_TTL_SECONDS)
                .await?;
        } else {
            let sum = bucket
                .get(FIELD_SUM)
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or(0.0)
                + watts;
            let count = bucket
                .get(FIELD_COUNT)
                .and_then(|value| value.parse::<i64>().ok())
                .unwrap_or(0)
                + 1;
            self.kv
                .hset_all(
                    &bucket_key,
                    &[
                        (FIELD_MINUTE.to_string(), stamp.minute_id.clone()),
                        (FIELD_SUM.to_string(), sum.to_string()),
                        (FIELD_COUNT.to_string(), count.to_string()),
                    ],
                )
                .await?;
        }
        Ok(())
    }

    /// 读取指定日历日的累计能耗（瓦·秒）。
    pub async fn energy_for_day(
        &self,
        device: &str,
        day_id: &str,
    ) -> Result<Option<f64>, StorageError> {
        let raw = self.kv.get(&keys::energy(device, day_id)).await?;
        Ok(raw.and_then(|value| value.parse::<f64>().ok()))
    }

    /// 读取分钟平均功率时序（最新在前），跳过无法解码的条目。
    pub async fn power_series(
        &self,
        device: &str,
    ) -> Result<Vec<PowerSeriesEntry>, StorageError> {
        let raw = self
            .kv
            .lrange(&keys::power_series(device), 0, MAX_POWER_SERIES_ENTRIES)
            .await?;
        Ok(raw
            .iter()
            .filter_map(|line| PowerSeriesEntry::parse_line(line))
            .collect())
    }
}
