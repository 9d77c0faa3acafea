//! 按设备命名空间的键布局。
//!
//! 所有键以 `ups:` 为前缀，设备名作为命名空间段；同一设备的全部键
//! 只由该设备的轮询任务写入。

/// 最新快照哈希。
pub fn snapshot(device: &str) -> String {
    format!("ups:snap:{}", device)
}

/// 历史时序列表（JSON 条目，rpush 追加）。
pub fn history(device: &str) -> String {
    format!("ups:hist:{}", device)
}

/// 历史键扫描前缀（保留窗口裁剪用）。
pub const HISTORY_PREFIX: &str = "ups:hist:";

/// 最近一次已见状态文本。
pub fn status_last(device: &str) -> String {
    format!("ups:event:status:last:{}", device)
}

/// 最近一次已见转换原因文本。
pub fn lastxfer_last(device: &str) -> String {
    format!("ups:event:lastxfer:last:{}", device)
}

/// 事件列表（lpush，最新在前）。
pub fn event_list(device: &str) -> String {
    format!("ups:event:list:{}", device)
}

/// 单日能耗计数（瓦·秒），day 为 `%Y%m%d`。
pub fn energy(device: &str, day: &str) -> String {
    format!("ups:energy:{}:{}", device, day)
}

/// 分钟功率累加桶（哈希：minute / sum / count）。
pub fn minute_bucket(device: &str) -> String {
    format!("ups:watts:minute:last:{}", device)
}

/// 分钟平均功率时序列表。
pub fn power_series(device: &str) -> String {
    format!("ups:watts:permin:{}", device)
}

/// 告警冷却记录，fingerprint 为消息内容摘要。
pub fn alert_cooldown(device: &str, fingerprint: &str) -> String {
    format!("ups:alert:last:{}:{}", device, fingerprint)
}

/// 已发送告警的滚动日志。
pub fn recent_alerts(device: &str) -> String {
    format!("ups:alerts:recent:{}", device)
}

/// 电压偏差滚动样本列表。
pub fn voltage_samples(device: &str) -> String {
    format!("ups:volt:dev:samples:{}", device)
}

/// 机群配置文档（单键 JSON）。
pub const CONFIG_DOC: &str = "ups:config:json";
