use async_trait::async_trait;
use domain::report::fields;
use domain::{DeviceConfig, RawReport, UiSettings};
use std::sync::Arc;
use std::sync::Mutex;
use upsmon_alerts::{AlertEngine, NotificationSink, NotifyError};
use upsmon_storage::{InMemoryKvStore, KvStore, keys};

#[derive(Default)]
struct RecordingSink {
    batches: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingSink {
    fn batches(&self) -> Vec<(String, Vec<String>)> {
        self.batches.lock().expect("lock").clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, device_name: &str, messages: &[String]) -> Result<(), NotifyError> {
        self.batches
            .lock()
            .expect("lock")
            .push((device_name.to_string(), messages.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn send(&self, _device_name: &str, _messages: &[String]) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("forced failure".to_string()))
    }
}

fn device(name: &str) -> DeviceConfig {
    DeviceConfig {
        name: name.to_string(),
        host: "10.0.0.5".to_string(),
        port: 3551,
        interval_seconds: 30,
        alert_loadpct_high: None,
        alert_bcharge_low: Some(30.0),
        alert_on_battery: false,
        alert_runtime_low_minutes: None,
    }
}

fn low_charge_report() -> RawReport {
    let mut report = RawReport::new();
    report.set(fields::BCHARGE, "25.0 Percent");
    report.set(fields::STATUS, "ONLINE");
    report
}

const NOW: i64 = 1_700_000_000;

#[tokio::test]
async fn triggered_message_handed_off_once_and_logged() {
    let kv = Arc::new(InMemoryKvStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = AlertEngine::new(kv.clone(), sink.clone());
    let ui = UiSettings::default();

    let outcome = engine
        .process(&device("rack-ups"), &ui, &low_charge_report(), NOW)
        .await
        .expect("process");
    assert_eq!(outcome.triggered.len(), 1);
    assert_eq!(outcome.sent.len(), 1);
    assert_eq!(outcome.suppressed, 0);

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, "rack-ups");
    assert!(batches[0].1[0].starts_with("Battery charge low"));

    let recent = engine.recent_alerts("rack-ups").await.expect("recent");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].0, NOW);
}

#[tokio::test]
async fn identical_message_suppressed_until_cooldown_expires() {
    let kv = Arc::new(InMemoryKvStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = AlertEngine::new(kv.clone(), sink.clone());
    let ui = UiSettings::default();
    let rack = device("rack-ups");
    let report = low_charge_report();

    let first = engine.process(&rack, &ui, &report, NOW).await.expect("process");
    assert_eq!(first.sent.len(), 1);

    // 冷却窗口内重复触发被抑制
    let second = engine
        .process(&rack, &ui, &report, NOW + 60)
        .await
        .expect("process");
    assert_eq!(second.triggered.len(), 1);
    assert!(second.sent.is_empty());
    assert_eq!(second.suppressed, 1);
    assert_eq!(sink.batches().len(), 1);

    // 窗口过期后重新可发
    kv.advance_secs(1800);
    let third = engine
        .process(&rack, &ui, &report, NOW + 1800)
        .await
        .expect("process");
    assert_eq!(third.sent.len(), 1);
    assert_eq!(sink.batches().len(), 2);
}

#[tokio::test]
async fn different_device_same_message_not_deduplicated() {
    let kv = Arc::new(InMemoryKvStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = AlertEngine::new(kv, sink.clone());
    let ui = UiSettings::default();
    let report = low_charge_report();

    engine
        .process(&device("rack-ups"), &ui, &report, NOW)
        .await
        .expect("process");
    engine
        .process(&device("edge-ups"), &ui, &report, NOW)
        .await
        .expect("process");
    assert_eq!(sink.batches().len(), 2);
}

#[tokio::test]
async fn delivery_failure_keeps_cooldown_and_log() {
    let kv = Arc::new(InMemoryKvStore::new());
    let engine = AlertEngine::new(kv.clone(), Arc::new(FailingSink));
    let ui = UiSettings::default();
    let rack = device("rack-ups");
    let report = low_charge_report();

    let outcome = engine.process(&rack, &ui, &report, NOW).await.expect("process");
    assert_eq!(outcome.sent.len(), 1);

    // 投递失败不清除冷却：下一周期仍被抑制
    let again = engine
        .process(&rack, &ui, &report, NOW + 60)
        .await
        .expect("process");
    assert!(again.sent.is_empty());
    assert_eq!(again.suppressed, 1);

    // 最近告警日志在投递尝试之前已提交
    let recent = engine.recent_alerts("rack-ups").await.expect("recent");
    assert_eq!(recent.len(), 1);
}

fn quiet_device(name: &str) -> DeviceConfig {
    DeviceConfig {
        alert_bcharge_low: None,
        ..device(name)
    }
}

#[tokio::test]
async fn burst_rule_fires_at_three_events_in_window() {
    let kv = Arc::new(InMemoryKvStore::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = AlertEngine::new(kv.clone(), sink.clone());
    let ui = UiSettings {
        enable_transfer_burst_alert: true,
        ..UiSettings::default()
    };
    let rack = quiet_device("rack-ups");
    let mut report = RawReport::new();
    report.set(fields::STATUS, "ONLINE");

    let event_key = keys::event_list("rack-ups");
    // 两条窗口内事件 + 一条窗口外事件：不触发
    kv.lpush(
        &event_key,
        &[
            format!("{}|STATUS|ONBATT", NOW - 4000),
            format!("{}|STATUS|ONBATT", NOW - 300),
            format!("{}|STATUS|ONBATT", NOW - 100),
        ],
    )
    .await
    .expect("seed");
    let outcome = engine.process(&rack, &ui, &report, NOW).await.expect("process");
    assert!(outcome.triggered.is_empty());

    // 第三条窗口内事件：触发
    kv.lpush(&event_key, &[format!("{}|STATUS|ONBATT", NOW - 10)])
        .await
        .expect("seed");
    let outcome = engine.process(&rack, &ui, &report, NOW).await.expect("process");
    assert_eq!(outcome.triggered.len(), 1);
    assert!(outcome.triggered[0].starts_with("Frequent battery events: 3"));
}

#[tokio::test]
async fn burst_rule_ignores_non_status_events() {
    let kv = Arc::new(InMemoryKvStore::new());
    let engine = AlertEngine::new(kv.clone(), Arc::new(RecordingSink::default()));
    let ui = UiSettings {
        enable_transfer_burst_alert: true,
        ..UiSettings::default()
    };
    let mut report = RawReport::new();
    report.set(fields::STATUS, "ONLINE");

    kv.lpush(
        &keys::event_list("rack-ups"),
        &[
            format!("{}|XFER|ONBATT cause", NOW - 100),
            format!("{}|STATUS|ONBATT", NOW - 90),
            format!("{}|STATUS|ONLINE", NOW - 80),
            format!("{}|STATUS|ONBATT", NOW - 70),
        ],
    )
    .await
    .expect("seed");
    let outcome = engine
        .process(&quiet_device("rack-ups"), &ui, &report, NOW)
        .await
        .expect("process");
    assert!(outcome.triggered.is_empty());
}

fn deviation_report() -> RawReport {
    // |209.3 - 230| / 230 * 100 = 9.0%
    let mut report = RawReport::new();
    report.set(fields::STATUS, "ONLINE");
    report.set(fields::LINEV, "209.3 Volts");
    report.set(fields::NOMINV, "230 Volts");
    report
}

#[tokio::test]
async fn voltage_rule_needs_ten_samples_before_firing() {
    let kv = Arc::new(InMemoryKvStore::new());
    let engine = AlertEngine::new(kv.clone(), Arc::new(RecordingSink::default()));
    let ui = UiSettings {
        enable_voltage_deviation_alert: true,
        ..UiSettings::default()
    };
    let rack = quiet_device("rack-ups");
    let report = deviation_report();

    // 前 9 个样本平均 9%：不触发
    for cycle in 0..9 {
        let outcome = engine
            .process(&rack, &ui, &report, NOW + cycle)
            .await
            .expect("process");
        assert!(outcome.triggered.is_empty(), "cycle {}", cycle);
    }
    assert_eq!(engine.voltage_samples("rack-ups").await.expect("samples").len(), 9);

    // 第 10 个样本：触发
    let outcome = engine
        .process(&rack, &ui, &report, NOW + 9)
        .await
        .expect("process");
    assert_eq!(outcome.triggered.len(), 1);
    assert!(
        outcome.triggered[0].starts_with("High average voltage deviation: 9.0% over 10 samples")
    );
}

#[tokio::test]
async fn voltage_rule_quiet_when_deviation_small() {
    let kv = Arc::new(InMemoryKvStore::new());
    let engine = AlertEngine::new(kv.clone(), Arc::new(RecordingSink::default()));
    let ui = UiSettings {
        enable_voltage_deviation_alert: true,
        ..UiSettings::default()
    };
    let rack = quiet_device("rack-ups");
    let mut report = RawReport::new();
    report.set(fields::LINEV, "228.0 Volts");
    report.set(fields::NOMINV, "230 Volts");

    for cycle in 0..12 {
        let outcome = engine
            .process(&rack, &ui, &report, NOW + cycle)
            .await
            .expect("process");
        assert!(outcome.triggered.is_empty());
    }
}

#[tokio::test]
async fn trend_rules_disabled_by_default() {
    let kv = Arc::new(InMemoryKvStore::new());
    let engine = AlertEngine::new(kv.clone(), Arc::new(RecordingSink::default()));
    let ui = UiSettings::default();

    kv.lpush(
        &keys::event_list("rack-ups"),
        &[
            format!("{}|STATUS|ONBATT", NOW - 30),
            format!("{}|STATUS|ONBATT", NOW - 20),
            format!("{}|STATUS|ONBATT", NOW - 10),
        ],
    )
    .await
    .expect("seed");
    let outcome = engine
        .process(&quiet_device("rack-ups"), &ui, &deviation_report(), NOW)
        .await
        .expect("process");
    assert!(outcome.triggered.is_empty());
    // 规则关闭时不积累电压样本
    assert!(engine.voltage_samples("rack-ups").await.expect("samples").is_empty());
}
