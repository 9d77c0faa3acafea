//! 状态采集能力
//!
//! 设备状态协议本身是外部协作者：通过 `apcaccess` CLI 一次性拉取
//! `key : value` 行文本并解析为 [`RawReport`]。取数必须有内部超时，
//! 单台慢设备不能无限期阻塞自己的轮询周期。

use async_trait::async_trait;
use domain::RawReport;
use domain::report::fields;
use std::time::Duration;
use tokio::process::Command;

/// 状态取数错误（均为单周期瞬态，下一周期隐式重试）。
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("failed to launch status command: {0}")]
    Launch(String),
    #[error("status command exit {code}: {diagnostic}")]
    Exit { code: i32, diagnostic: String },
    #[error("status fetch timed out after {0}s")]
    Timeout(u64),
    #[error("status output contained no fields")]
    Empty,
}

/// 状态源抽象。
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, host: &str, port: u16) -> Result<RawReport, StatusError>;
}

/// 解析 apcaccess 状态输出（`KEY : value` 行），并规范化别名字段。
pub fn parse_status_output(text: &str) -> RawReport {
    let mut report = RawReport::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        report.set(key.trim(), value.trim());
    }
    if !report.contains(fields::UPSNAME)
        && let Some(name) = report.get(fields::NAME).map(str::to_string)
    {
        report.set(fields::UPSNAME, name);
    }
    if let Some(model) = report.get(fields::MODEL).map(str::to_string) {
        report.set(fields::MODEL_NAME, model);
    }
    report
}

/// 默认取数超时。
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// 基于 apcaccess CLI 的状态源。
pub struct ApcAccessSource {
    binary: String,
    timeout: Duration,
}

impl ApcAccessSource {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Default for ApcAccessSource {
    fn default() -> Self {
        Self::new("apcaccess", DEFAULT_FETCH_TIMEOUT)
    }
}

#[async_trait]
impl StatusSource for ApcAccessSource {
    async fn fetch(&self, host: &str, port: u16) -> Result<RawReport, StatusError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary)
                .arg("-h")
                .arg(format!("{}:{}", host, port))
                .arg("status")
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| StatusError::Timeout(self.timeout.as_secs()))?
        .map_err(|err| StatusError::Launch(err.to_string()))?;

        if !output.status.success() {
            return Err(StatusError::Exit {
                code: output.status.code().unwrap_or(-1),
                diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let report = parse_status_output(&text);
        if report.is_empty() {
            return Err(StatusError::Empty);
        }
        Ok(report)
    }
}

/// 固定报文状态源（用于接线与测试）。
pub struct StaticStatusSource {
    report: RawReport,
}

impl StaticStatusSource {
    pub fn new(report: RawReport) -> Self {
        Self { report }
    }
}

#[async_trait]
impl StatusSource for StaticStatusSource {
    async fn fetch(&self, _host: &str, _port: u16) -> Result<RawReport, StatusError> {
        Ok(self.report.clone())
    }
}
