//! 监控主机进程：装配各能力模块并运行监督循环。

use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use upsmon_alerts::{NotificationSink, SmtpNotifier};
use upsmon_config::{AppConfig, ConfigProvider};
use upsmon_poller::{PollerContext, Supervisor};
use upsmon_status::ApcAccessSource;
use upsmon_storage::{KvStore, RedisKvStore};
use upsmon_telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let kv: Arc<dyn KvStore> = Arc::new(RedisKvStore::connect(&config.redis_url)?);
    let provider = Arc::new(ConfigProvider::new(kv.clone()));

    // 配置源启动失败是致命错误，直接向宿主传播
    let boot = provider.current().await?;
    info!(
        target: "upsmon",
        devices = boot.devices.len(),
        "configuration loaded"
    );

    let source = Arc::new(ApcAccessSource::new(
        config.apcaccess_bin.clone(),
        Duration::from_secs(config.status_timeout_seconds),
    ));
    let sink: Arc<dyn NotificationSink> = Arc::new(SmtpNotifier::new(provider.clone()));
    let ctx = Arc::new(PollerContext::new(source, kv, provider, sink));
    let supervisor = Supervisor::new(ctx);

    tokio::select! {
        _ = supervisor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!(target: "upsmon", "shutdown requested");
        }
    }
    supervisor.shutdown().await;
    Ok(())
}
