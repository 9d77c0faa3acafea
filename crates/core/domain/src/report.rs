//! 设备状态报文模型
//!
//! RawReport 是一次状态查询返回的无类型键值映射；数值字段可能携带
//! 单位后缀（如 "15.0 Minutes"），通过 [`crate::parse`] 显式解析。

use crate::parse;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 报文字段词汇表（apcupsd 状态输出 + 派生字段）。
pub mod fields {
    pub const STATUS: &str = "STATUS";
    pub const LOADPCT: &str = "LOADPCT";
    pub const BCHARGE: &str = "BCHARGE";
    pub const TIMELEFT: &str = "TIMELEFT";
    pub const LINEV: &str = "LINEV";
    pub const NOMINV: &str = "NOMINV";
    /// 部分固件使用的标称输入电压别名。
    pub const NOMINPUT: &str = "NOMINPUT";
    pub const NOMPOWER: &str = "NOMPOWER";
    pub const LASTXFER: &str = "LASTXFER";
    pub const NAME: &str = "NAME";
    pub const UPSNAME: &str = "UPSNAME";
    pub const MODEL: &str = "MODEL";
    pub const MODEL_NAME: &str = "MODEL_NAME";

    /// 派生字段：标称功率 × 负载百分比。
    pub const DERIVED_WATTS: &str = "DERIVED_WATTS";
    /// 派生字段：剩余负载余量百分比。
    pub const HEADROOM_PCT: &str = "HEADROOM_PCT";
    /// 派生字段：规范化后的剩余运行分钟数。
    pub const RUNTIME_MINUTES: &str = "RUNTIME_MINUTES";

    /// 快照写入时间戳字段（与报文字段共存于同一哈希）。
    pub const INGESTED_AT: &str = "_ts";
}

/// 一次状态查询返回的原始报文。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawReport(BTreeMap<String, String>);

impl RawReport {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// 解析字段的前导数值 token，解析失败返回 None。
    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(parse::leading_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RawReport {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 设备的最新快照：最近一次成功周期的富化报文 + 写入时间戳。
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub report: RawReport,
    pub ts: i64,
}

/// 历史时序条目：每个成功周期追加一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub data: RawReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parses_leading_token() {
        let mut report = RawReport::new();
        report.set(fields::TIMELEFT, "15.0 Minutes");
        report.set(fields::LOADPCT, "42.5 Percent");
        report.set(fields::STATUS, "ONLINE");
        assert_eq!(report.numeric(fields::TIMELEFT), Some(15.0));
        assert_eq!(report.numeric(fields::LOADPCT), Some(42.5));
        assert_eq!(report.numeric(fields::STATUS), None);
        assert_eq!(report.numeric(fields::BCHARGE), None);
    }

    #[test]
    fn history_entry_json_shape() {
        let mut report = RawReport::new();
        report.set(fields::STATUS, "ONLINE");
        let entry = HistoryEntry {
            ts: 1_700_000_000,
            data: report,
        };
        let json = serde_json::to_string(&entry).expect("serialize");
        assert_eq!(json, r#"{"ts":1700000000,"data":{"STATUS":"ONLINE"}}"#);
    }
}
