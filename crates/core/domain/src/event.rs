//! 离散状态事件与功率时序条目的线格式。
//!
//! 事件与分钟平均功率以 `|` 分隔的单行文本存入有界列表：
//! - 事件：`{ts}|STATUS|{detail}` / `{ts}|XFER|{detail}`
//! - 功率：`{minute}|{avg:.2}`

/// 事件类别：状态文本变化或最近一次转换原因变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Status,
    Transfer,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Status => "STATUS",
            EventKind::Transfer => "XFER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STATUS" => Some(EventKind::Status),
            "XFER" => Some(EventKind::Transfer),
            _ => None,
        }
    }
}

/// 检测到的一次离散状态转换。
#[derive(Debug, Clone, PartialEq)]
pub struct UpsEvent {
    pub ts: i64,
    pub kind: EventKind,
    pub detail: String,
}

impl UpsEvent {
    pub fn new(ts: i64, kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            ts,
            kind,
            detail: detail.into(),
        }
    }

    pub fn to_line(&self) -> String {
        format!("{}|{}|{}", self.ts, self.kind.as_str(), self.detail)
    }

    /// 解析列表条目；格式非法返回 None。detail 内的 `|` 保留。
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, '|');
        let ts = parts.next()?.parse::<i64>().ok()?;
        let kind = EventKind::parse(parts.next()?)?;
        let detail = parts.next()?;
        Some(Self::new(ts, kind, detail))
    }
}

/// 一分钟的平均功率样本。
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSeriesEntry {
    /// 分钟 ID（UTC，`%Y%m%d%H%M`）。
    pub minute: String,
    pub avg_watts: f64,
}

impl PowerSeriesEntry {
    pub fn to_line(&self) -> String {
        format!("{}|{:.2}", self.minute, self.avg_watts)
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let (minute, avg) = line.split_once('|')?;
        let avg_watts = avg.parse::<f64>().ok()?;
        Some(Self {
            minute: minute.to_string(),
            avg_watts,
        })
    }
}
