//! 告警规则
//!
//! 无状态阈值规则只看当前报文；两条趋势规则读写按设备命名空间的
//! 滚动状态（事件列表 / 电压偏差样本列表）。

use domain::report::fields;
use domain::{DeviceConfig, EventKind, RawReport, UpsEvent};
use upsmon_storage::{KvStore, StorageError, keys};

/// 状态文本中表示电池供电的关键字。
pub const ON_BATTERY_KEYWORDS: [&str; 2] = ["ONBATT", "ON BATTERY"];

/// burst 规则的观察窗口。
pub const BURST_WINDOW_SECONDS: i64 = 3600;
/// burst 规则的触发次数。
pub const BURST_THRESHOLD: usize = 3;
/// 读取事件列表的条数上限。
const BURST_SCAN_LIMIT: i64 = 200;

/// 电压偏差样本列表容量。
pub const VOLTAGE_SAMPLE_CAP: i64 = 50;
/// 电压偏差规则的最小样本数。
pub const VOLTAGE_MIN_SAMPLES: usize = 10;
/// 滚动平均偏差阈值（百分比）。
pub const VOLTAGE_AVG_THRESHOLD_PCT: f64 = 8.0;

/// 按设备配置评估无状态阈值规则，返回触发的消息文本。
pub fn threshold_messages(device: &DeviceConfig, report: &RawReport) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(threshold) = device.alert_loadpct_high
        && let Some(loadpct) = report.numeric(fields::LOADPCT)
        && loadpct >= threshold
    {
        messages.push(format!(
            "Load percentage high: {}% >= {}%",
            loadpct, threshold
        ));
    }

    if let Some(threshold) = device.alert_bcharge_low
        && let Some(bcharge) = report.numeric(fields::BCHARGE)
        && bcharge <= threshold
    {
        messages.push(format!("Battery charge low: {}% <= {}%", bcharge, threshold));
    }

    if device.alert_on_battery {
        let status = report.get(fields::STATUS).unwrap_or("").to_uppercase();
        if ON_BATTERY_KEYWORDS
            .iter()
            .any(|keyword| status.contains(keyword))
        {
            messages.push(format!("UPS on battery: status={}", status));
        }
    }

    if let Some(threshold) = device.alert_runtime_low_minutes
        && let Some(runtime) = report.numeric(fields::TIMELEFT)
        && runtime <= threshold
    {
        messages.push(format!("Runtime low: {}m <= {}m", runtime, threshold));
    }

    messages
}

/// burst 规则：统计窗口内 STATUS 事件中的电池供电次数。
pub async fn burst_message(
    kv: &dyn KvStore,
    device_name: &str,
    now: i64,
) -> Result<Option<String>, StorageError> {
    let events = kv
        .lrange(&keys::event_list(device_name), 0, BURST_SCAN_LIMIT)
        .await?;
    let count = events
        .iter()
        .filter_map(|line| UpsEvent::parse_line(line))
        .filter(|event| now - event.ts <= BURST_WINDOW_SECONDS)
        .filter(|event| event.kind == EventKind::Status && event.detail.contains("ONBATT"))
        .count();
    if count >= BURST_THRESHOLD {
        Ok(Some(format!(
            "Frequent battery events: {} in last hour",
            count
        )))
    } else {
        Ok(None)
    }
}

/// 电压偏差规则：将本周期偏差推入滚动样本列表，满足样本数门槛且
/// 滚动平均超阈值时触发。
pub async fn voltage_deviation_message(
    kv: &dyn KvStore,
    device_name: &str,
    report: &RawReport,
) -> Result<Option<String>, StorageError> {
    let linev = report.numeric(fields::LINEV);
    let nominal = report
        .numeric(fields::NOMINV)
        .or_else(|| report.numeric(fields::NOMINPUT));
    let (Some(linev), Some(nominal)) = (linev, nominal) else {
        return Ok(None);
    };
    if linev == 0.0 || nominal == 0.0 {
        return Ok(None);
    }

    let deviation_pct = (linev - nominal).abs() / nominal * 100.0;
    let sample_key = keys::voltage_samples(device_name);
    kv.lpush(&sample_key, &[format!("{:.2}", deviation_pct)])
        .await?;
    kv.ltrim(&sample_key, 0, VOLTAGE_SAMPLE_CAP - 1).await?;

    let samples = kv.lrange(&sample_key, 0, -1).await?;
    let values: Vec<f64> = samples
        .iter()
        .filter_map(|sample| sample.parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    let average = values.iter().sum::<f64>() / values.len() as f64;
    if average > VOLTAGE_AVG_THRESHOLD_PCT && values.len() >= VOLTAGE_MIN_SAMPLES {
        Ok(Some(format!(
            "High average voltage deviation: {:.1}% over {} samples",
            average,
            values.len()
        )))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_with_thresholds() -> DeviceConfig {
        DeviceConfig {
            name: "rack-ups".to_string(),
            host: "10.0.0.5".to_string(),
            port: 3551,
            interval_seconds: 30,
            alert_loadpct_high: Some(80.0),
            alert_bcharge_low: Some(30.0),
            alert_on_battery: true,
            alert_runtime_low_minutes: Some(10.0),
        }
    }

    #[test]
    fn all_threshold_rules_fire_together() {
        let mut report = RawReport::new();
        report.set(fields::LOADPCT, "85.0 Percent");
        report.set(fields::BCHARGE, "25.0 Percent");
        report.set(fields::STATUS, "ONBATT");
        report.set(fields::TIMELEFT, "5.0 Minutes");
        let messages = threshold_messages(&device_with_thresholds(), &report);
        assert_eq!(messages.len(), 4);
        assert!(messages[0].starts_with("Load percentage high"));
        assert!(messages[1].starts_with("Battery charge low"));
        assert!(messages[2].contains("status=ONBATT"));
        assert!(messages[3].starts_with("Runtime low"));
    }

    #[test]
    fn rules_quiet_when_within_bounds() {
        let mut report = RawReport::new();
        report.set(fields::LOADPCT, "40.0 Percent");
        report.set(fields::BCHARGE, "100.0 Percent");
        report.set(fields::STATUS, "ONLINE");
        report.set(fields::TIMELEFT, "45.0 Minutes");
        assert!(threshold_messages(&device_with_thresholds(), &report).is_empty());
    }

    #[test]
    fn unparsable_fields_never_fire() {
        let mut report = RawReport::new();
        report.set(fields::LOADPCT, "N/A");
        report.set(fields::TIMELEFT, "calculating");
        assert!(threshold_messages(&device_with_thresholds(), &report).is_empty());
    }

    #[test]
    fn disabled_rules_skip_matching_values() {
        let device = DeviceConfig {
            alert_loadpct_high: None,
            alert_bcharge_low: None,
            alert_on_battery: false,
            alert_runtime_low_minutes: None,
            ..device_with_thresholds()
        };
        let mut report = RawReport::new();
        report.set(fields::LOADPCT, "99.0 Percent");
        report.set(fields::STATUS, "ONBATT");
        assert!(threshold_messages(&device, &report).is_empty());
    }

    #[test]
    fn on_battery_matches_spaced_keyword() {
        let device = DeviceConfig {
            alert_loadpct_high: None,
            alert_bcharge_low: None,
            alert_runtime_low_minutes: None,
            ..device_with_thresholds()
        };
        let mut report = RawReport::new();
        report.set(fields::STATUS, "on battery");
        let messages = threshold_messages(&device, &report);
        assert_eq!(messages.len(), 1);
    }
}
