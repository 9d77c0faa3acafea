//! 追踪初始化与进程内计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub fetch_failures: u64,
    pub store_failures: u64,
    pub events_recorded: u64,
    pub alerts_triggered: u64,
    pub alerts_suppressed: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
    pub history_entries_pruned: u64,
    pub reconcile_runs: u64,
    pub pollers_started: u64,
    pub pollers_stopped: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    fetch_failures: AtomicU64,
    store_failures: AtomicU64,
    events_recorded: AtomicU64,
    alerts_triggered: AtomicU64,
    alerts_suppressed: AtomicU64,
    notifications_sent: AtomicU64,
    notification_failures: AtomicU64,
    history_entries_pruned: AtomicU64,
    reconcile_runs: AtomicU64,
    pollers_started: AtomicU64,
    pollers_stopped: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            events_recorded: AtomicU64::new(0),
            alerts_triggered: AtomicU64::new(0),
            alerts_suppressed: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notification_failures: AtomicU64::new(0),
            history_entries_pruned: AtomicU64::new(0),
            reconcile_runs: AtomicU64::new(0),
            pollers_started: AtomicU64::new(0),
            pollers_stopped: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            events_recorded: self.events_recorded.load(Ordering::Relaxed),
            alerts_triggered: self.alerts_triggered.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
            history_entries_pruned: self.history_entries_pruned.load(Ordering::Relaxed),
            reconcile_runs: self.reconcile_runs.load(Ordering::Relaxed),
            pollers_started: self.pollers_started.load(Ordering::Relaxed),
            pollers_stopped: self.pollers_stopped.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录成功完成的轮询周期。
pub fn record_cycle_completed() {
    metrics().cycles_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录失败的轮询周期（取数或落库失败）。
pub fn record_cycle_failed() {
    metrics().cycles_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录状态取数失败次数。
pub fn record_fetch_failure() {
    metrics().fetch_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录存储写入失败次数。
pub fn record_store_failure() {
    metrics().store_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录检测到的离散事件条数。
pub fn record_events_recorded(count: u64) {
    metrics().events_recorded.fetch_add(count, Ordering::Relaxed);
}

/// 记录本周期触发的告警消息条数。
pub fn record_alerts_triggered(count: u64) {
    metrics().alerts_triggered.fetch_add(count, Ordering::Relaxed);
}

/// 记录被冷却抑制的告警消息条数。
pub fn record_alerts_suppressed(count: u64) {
    metrics().alerts_suppressed.fetch_add(count, Ordering::Relaxed);
}

/// 记录成功移交通知接收端的批次数。
pub fn record_notification_sent() {
    metrics().notifications_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录通知投递失败次数。
pub fn record_notification_failure() {
    metrics()
        .notification_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录保留窗口裁剪删除的历史条目数。
pub fn record_history_pruned(count: u64) {
    metrics()
        .history_entries_pruned
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录配置调和执行次数。
pub fn record_reconcile_run() {
    metrics().reconcile_runs.fetch_add(1, Ordering::Relaxed);
}

/// 记录新启动的轮询任务数。
pub fn record_poller_started() {
    metrics().pollers_started.fetch_add(1, Ordering::Relaxed);
}

/// 记录被停止的轮询任务数。
pub fn record_poller_stopped() {
    metrics().pollers_stopped.fetch_add(1, Ordering::Relaxed);
}
