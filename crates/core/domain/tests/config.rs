use domain::{DeviceConfig, MonitorConfig};

#[test]
fn device_defaults_apply_on_minimal_document() {
    let json = r#"{"name": "rack-ups", "host": "10.0.0.5"}"#;
    let device: DeviceConfig = serde_json::from_str(json).expect("parse");
    assert_eq!(device.port, 3551);
    assert_eq!(device.interval_seconds, 30);
    assert_eq!(device.alert_loadpct_high, None);
    assert!(!device.alert_on_battery);
}

#[test]
fn monitor_config_reads_legacy_document_shape() {
    let json = r#"{
        "ups": [
            {"name": "rack-ups", "host": "10.0.0.5", "port": 3551, "interval_seconds": 30},
            {"name": "edge-ups", "host": "10.0.0.6", "alert_bcharge_low": 20.0}
        ],
        "smtp": {"host": "mail.local", "port": 587, "use_tls": true, "to_addrs": ["ops@local"]},
        "ui": {"enable_transfer_burst_alert": true}
    }"#;
    let config: MonitorConfig = serde_json::from_str(json).expect("parse");
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.device("edge-ups").map(|d| d.port), Some(3551));
    let smtp = config.smtp.expect("smtp");
    assert_eq!(smtp.subject_prefix, "[UPS]");
    assert!(smtp.use_tls);
    assert!(config.ui.enable_transfer_burst_alert);
    // 未提供的开关保持默认值
    assert!(config.ui.show_events);
    assert!(!config.ui.enable_voltage_deviation_alert);
}

#[test]
fn empty_document_round_trip_uses_ups_field() {
    let json = serde_json::to_string(&MonitorConfig::empty()).expect("serialize");
    assert!(json.contains(r#""ups":[]"#));
    let back: MonitorConfig = serde_json::from_str("{}").expect("parse empty");
    assert!(back.devices.is_empty());
    assert!(back.smtp.is_none());
}
