//! 设备轮询循环
//!
//! 每台设备一个任务：取数 → 派生 → 事件检测 → 能耗聚合 → 落库 →
//! 告警，随后无论成败都按设备配置的间隔休眠。任何单周期错误只记
//! 日志并跳过本周期剩余步骤，循环本身永不退出；停止由监督者取消
//! 任务完成（取消在休眠或取数等挂起点被观察到）。
//!
//! 单写者不变量：一台设备的全部键只由它自己的轮询任务写入，
//! 跨设备无顺序保证也无需加锁。

use crate::derive;
use crate::energy::EnergyAggregator;
use crate::events::EventDetector;
use chrono::{DateTime, Utc};
use domain::report::fields;
use domain::{DeviceConfig, RawReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use upsmon_alerts::{AlertEngine, NotificationSink};
use upsmon_config::ConfigProvider;
use upsmon_status::StatusSource;
use upsmon_storage::{KvStore, MetricStore, StorageError};
use upsmon_telemetry::{
    record_cycle_completed, record_cycle_failed, record_events_recorded, record_fetch_failure,
    record_store_failure,
};

/// 一个周期的时间标记：时间戳 + UTC 日历日/分钟 ID，周期开始时计算一次。
#[derive(Debug, Clone)]
pub struct CycleStamp {
    pub ts: i64,
    /// `%Y%m%d`
    pub day_id: String,
    /// `%Y%m%d%H%M`
    pub minute_id: String,
}

impl CycleStamp {
    pub fn now() -> Self {
        Self::from_ts(Utc::now().timestamp())
    }

    pub fn from_ts(ts: i64) -> Self {
        let at = DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default();
        Self {
            ts,
            day_id: at.format("%Y%m%d").to_string(),
            minute_id: at.format("%Y%m%d%H%M").to_string(),
        }
    }
}

/// 全部轮询任务共享的依赖集。
pub struct PollerContext {
    pub source: Arc<dyn StatusSource>,
    pub provider: Arc<ConfigProvider>,
    pub metrics: MetricStore,
    pub events: EventDetector,
    pub energy: EnergyAggregator,
    pub alerts: AlertEngine,
}

impl PollerContext {
    pub fn new(
        source: Arc<dyn StatusSource>,
        kv: Arc<dyn KvStore>,
        provider: Arc<ConfigProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            source,
            provider,
            metrics: MetricStore::new(kv.clone()),
            events: EventDetector::new(kv.clone()),
            energy: EnergyAggregator::new(kv.clone()),
            alerts: AlertEngine::new(kv, sink),
        }
    }
}

/// 单台设备的轮询循环。
pub async fn run_device(ctx: Arc<PollerContext>, device: DeviceConfig) {
    info!(
        target: "upsmon.poller",
        device = %device.name,
        host = %device.host,
        port = device.port,
        interval = device.interval_seconds,
        "poller started"
    );
    loop {
        match ctx.source.fetch(&device.host, device.port).await {
            Ok(report) => {
                let stamp = CycleStamp::now();
                match run_cycle(&ctx, &device, report, &stamp).await {
                    Ok(()) => record_cycle_completed(),
                    Err(err) => {
                        // 本周期写入放弃，快照保持上次成功周期的值
                        record_cycle_failed();
                        record_store_failure();
                        warn!(
                            target: "upsmon.poller",
                            device = %device.name,
                            error = %err,
                            "cycle store write failed"
                        );
                    }
                }
            }
            Err(err) => {
                record_cycle_failed();
                record_fetch_failure();
                warn!(
                    target: "upsmon.poller",
                    device = %device.name,
                    error = %err,
                    "status fetch failed"
                );
            }
        }
        sleep(Duration::from_secs(device.interval_seconds)).await;
    }
}

/// 成功取数后的一个处理周期。
pub async fn run_cycle(
    ctx: &PollerContext,
    device: &DeviceConfig,
    mut report: RawReport,
    stamp: &CycleStamp,
) -> Result<(), StorageError> {
    report.set(fields::UPSNAME, device.name.clone());
    derive::enrich(&mut report);

    let events = ctx.events.observe(&device.name, &report, stamp.ts).await?;
    if !events.is_empty() {
        record_events_recorded(events.len() as u64);
        for event in &events {
            info!(
                target: "upsmon.poller",
                device = %device.name,
                kind = event.kind.as_str(),
                detail = %event.detail,
                "state transition"
            );
        }
    }

    if let Some(watts) = report.numeric(fields::DERIVED_WATTS) {
        ctx.energy
            .record(&device.name, watts, device.interval_seconds, stamp)
            .await?;
    }

    ctx.metrics
        .store_snapshot(&device.name, &report, stamp.ts)
        .await?;

    // 告警评估需要全局开关；配置暂不可用时跳过本周期的告警
    match ctx.provider.current().await {
        Ok(config) => {
            ctx.alerts
                .process(device, &config.ui, &report, stamp.ts)
                .await?;
        }
        Err(err) => {
            warn!(
                target: "upsmon.poller",
                device = %device.name,
                error = %err,
                "config unavailable, skipping alert evaluation"
            );
        }
    }
    Ok(())
}
