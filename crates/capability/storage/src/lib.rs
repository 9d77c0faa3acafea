//! 存储能力：远端键值原语与指标键空间。
//!
//! - [`KvStore`]：配置/快照/历史/事件/能耗/告警状态共用的键值原语接口
//! - [`RedisKvStore`]：生产实现（multiplexed tokio 连接）
//! - [`InMemoryKvStore`]：本地测试实现（含测试时钟）
//! - [`MetricStore`]：快照 + 有界历史的类型化封装
//! - [`keys`]：按设备命名空间的键布局

mod error;
mod in_memory;
pub mod keys;
mod kv;
mod metrics;
mod redis;

pub use error::StorageError;
pub use in_memory::InMemoryKvStore;
pub use kv::{KvOp, KvStore};
pub use metrics::{MAX_HISTORY_ENTRIES, MetricStore, RETENTION_SECONDS};
pub use self::redis::RedisKvStore;
