//! 任务监督
//!
//! 维护设备名 → 轮询任务句柄的映射，使任务集合跟随当前配置：
//! 固定间隔重算配置指纹（有序的 (name, host, port, interval) 元组），
//! 变化时在互斥段内调和——移除的设备停任务、新增的设备起任务。
//! 同名设备就地修改 host/port/interval 不重启在运行的任务
//! （名称决定生命周期；修改需通过删除再添加生效）。
//! 另有一条独立的维护循环按固定周期触发历史裁剪。

use crate::poll::{CycleStamp, PollerContext, run_device};
use domain::DeviceConfig;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use upsmon_config::ConfigError;
use upsmon_telemetry::{
    record_history_pruned, record_poller_started, record_poller_stopped, record_reconcile_run,
};

/// 监督任务的节奏参数。
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// 配置指纹检查间隔。
    pub reconcile_interval: Duration,
    /// 历史裁剪间隔。
    pub prune_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(15),
            prune_interval: Duration::from_secs(3600),
        }
    }
}

type Fingerprint = Vec<(String, String, u16, u64)>;

/// 轮询任务监督者。
pub struct Supervisor {
    ctx: Arc<PollerContext>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(ctx: Arc<PollerContext>) -> Self {
        Self::with_config(ctx, SupervisorConfig::default())
    }

    pub fn with_config(ctx: Arc<PollerContext>, config: SupervisorConfig) -> Self {
        Self {
            ctx,
            tasks: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn fingerprint(devices: &[DeviceConfig]) -> Fingerprint {
        let mut fingerprint: Fingerprint = devices
            .iter()
            .map(|device| {
                (
                    device.name.clone(),
                    device.host.clone(),
                    device.port,
                    device.interval_seconds,
                )
            })
            .collect();
        fingerprint.sort();
        fingerprint
    }

    /// 使任务集合与当前配置一致。
    ///
    /// 整个调和在任务映射的互斥段内进行，两次并发触发不会重复
    /// 启动同一设备的任务。
    pub async fn reconcile(&self) -> Result<(), ConfigError> {
        let mut tasks = self.tasks.lock().await;
        let config = self.ctx.provider.current().await?;
        record_reconcile_run();

        let configured: HashSet<&str> = config
            .devices
            .iter()
            .map(|device| device.name.as_str())
            .collect();

        // 移除的设备：停任务（取消在下一个挂起点生效，无需等待）
        let stale: Vec<String> = tasks
            .keys()
            .filter(|name| !configured.contains(name.as_str()))
            .cloned()
            .collect();
        for name in stale {
            if let Some(handle) = tasks.remove(&name) {
                handle.abort();
                record_poller_stopped();
                info!(target: "upsmon.supervisor", device = %name, "poller stopped");
            }
        }

        // 新增的设备：起任务；已在运行的不重启
        for device in &config.devices {
            if !tasks.contains_key(&device.name) {
                let handle = tokio::spawn(run_device(self.ctx.clone(), device.clone()));
                tasks.insert(device.name.clone(), handle);
                record_poller_started();
            }
        }
        Ok(())
    }

    /// 运行监督循环（初始调和 + 配置监视 + 历史裁剪），永不返回。
    pub async fn run(&self) {
        if let Err(err) = self.reconcile().await {
            warn!(target: "upsmon.supervisor", error = %err, "initial reconcile failed");
        }
        tokio::join!(self.watch_loop(), self.prune_loop());
    }

    async fn watch_loop(&self) {
        let mut last_fingerprint: Option<Fingerprint> = None;
        loop {
            tokio::time::sleep(self.config.reconcile_interval).await;
            match self.ctx.provider.current().await {
                Ok(config) => {
                    let fingerprint = Self::fingerprint(&config.devices);
                    if last_fingerprint.as_ref() != Some(&fingerprint) {
                        match self.reconcile().await {
                            Ok(()) => last_fingerprint = Some(fingerprint),
                            Err(err) => warn!(
                                target: "upsmon.supervisor",
                                error = %err,
                                "reconcile failed"
                            ),
                        }
                    }
                }
                Err(err) => {
                    debug!(target: "upsmon.supervisor", error = %err, "config watch error");
                }
            }
        }
    }

    async fn prune_loop(&self) {
        loop {
            let now = CycleStamp::now().ts;
            match self.ctx.metrics.prune_old(now).await {
                Ok(0) => {}
                Ok(removed) => {
                    record_history_pruned(removed);
                    info!(target: "upsmon.supervisor", removed, "history pruned");
                }
                Err(err) => {
                    warn!(target: "upsmon.supervisor", error = %err, "prune error");
                }
            }
            tokio::time::sleep(self.config.prune_interval).await;
        }
    }

    /// 当前在运行的轮询任务名（有序，用于观测与测试）。
    pub async fn active_pollers(&self) -> Vec<String> {
        let tasks = self.tasks.lock().await;
        let mut names: Vec<String> = tasks.keys().cloned().collect();
        names.sort();
        names
    }

    /// 停止全部轮询任务（宿主进程关停时调用）。
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for (name, handle) in tasks.drain() {
            handle.abort();
            record_poller_stopped();
            info!(target: "upsmon.supervisor", device = %name, "poller stopped");
        }
    }
}
