pub mod config;
pub mod event;
pub mod parse;
pub mod report;

pub use config::{DeviceConfig, DeviceUpdate, MonitorConfig, SmtpSettings, UiSettings};
pub use event::{EventKind, PowerSeriesEntry, UpsEvent};
pub use report::{HistoryEntry, RawReport, Snapshot};
