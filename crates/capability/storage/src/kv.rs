//! 键值存储接口 Trait 定义
//!
//! 所有监控状态（快照、历史、事件、能耗、告警冷却）都以按设备命名
//! 空间的键布局在这些原语之上：
//! - 字符串：get / set / set_ex / incr_by_float
//! - 列表：lpush / rpush / ltrim / lrange / lindex / lpop
//! - 哈希：hset_all / hgetall
//! - 键管理：del / expire / scan_prefix
//! - multi：原子批量写（涉及同一设备快照+历史的写入必须整体生效）
//!
//! 设计原则：
//! - 每台设备的键空间只由其自身的轮询任务写入（单写者不变量），
//!   接口本身不提供跨任务加锁
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;

/// 原子批量写中的单个操作。
#[derive(Debug, Clone)]
pub enum KvOp {
    Set {
        key: String,
        value: String,
    },
    SetEx {
        key: String,
        value: String,
        ttl_seconds: u64,
    },
    Del {
        key: String,
    },
    Expire {
        key: String,
        ttl_seconds: u64,
    },
    /// 依次压入队头（最后一个值最终在队头）。
    LPush {
        key: String,
        values: Vec<String>,
    },
    RPush {
        key: String,
        value: String,
    },
    /// Redis 索引语义（含负索引）；裁剪为空时删除键。
    LTrim {
        key: String,
        start: i64,
        stop: i64,
    },
    HSetAll {
        key: String,
        fields: Vec<(String, String)>,
    },
}

/// 远端键值存储接口。
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 写入并设置过期（秒）。
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StorageError>;

    async fn del(&self, key: &str) -> Result<(), StorageError>;

    /// 刷新已有键的过期时间；键不存在时为空操作。
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), StorageError>;

    /// 浮点原子累加，返回累加后的值。
    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, StorageError>;

    async fn lpush(&self, key: &str, values: &[String]) -> Result<(), StorageError>;

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), StorageError>;

    async fn lrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StorageError>;

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, StorageError>;

    /// 弹出队头元素（最老的 rpush 条目）。
    async fn lpop(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn hset_all(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), StorageError>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StorageError>;

    /// 按前缀扫描键名（SCAN 语义，结果顺序不保证）。
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// 原子应用一组写操作：要么全部生效，要么全部不生效。
    async fn multi(&self, ops: &[KvOp]) -> Result<(), StorageError>;
}
