//! 键值原语内存实现
//!
//! 仅用于本地测试和占位。实现与 Redis 一致的列表索引（含负索引）、
//! 哈希与惰性过期语义，并提供可前移的测试时钟。

use crate::error::StorageError;
use crate::kv::{KvOp, KvStore};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<String>),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at_ms: Option<i64>,
}

fn expired(entry: &Entry, now_ms: i64) -> bool {
    matches!(entry.expires_at_ms, Some(deadline) if deadline <= now_ms)
}

/// Redis 范围语义：负索引从尾部计，越界收敛；空范围返回 None。
fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

type Map = HashMap<String, Entry>;

fn live<'a>(map: &'a Map, key: &str, now_ms: i64) -> Option<&'a Entry> {
    map.get(key).filter(|entry| !expired(entry, now_ms))
}

fn drop_if_expired(map: &mut Map, key: &str, now_ms: i64) {
    if map.get(key).is_some_and(|entry| expired(entry, now_ms)) {
        map.remove(key);
    }
}

fn list_entry<'a>(
    map: &'a mut Map,
    key: &str,
    now_ms: i64,
) -> Result<&'a mut VecDeque<String>, StorageError> {
    drop_if_expired(map, key, now_ms);
    let entry = map.entry(key.to_string()).or_insert_with(|| Entry {
        value: Value::List(VecDeque::new()),
        expires_at_ms: None,
    });
    match &mut entry.value {
        Value::List(list) => Ok(list),
        _ => Err(StorageError::new("wrong type")),
    }
}

fn op_lpush(map: &mut Map, key: &str, values: &[String], now_ms: i64) -> Result<(), StorageError> {
    let list = list_entry(map, key, now_ms)?;
    for value in values {
        list.push_front(value.clone());
    }
    Ok(())
}

fn op_rpush(map: &mut Map, key: &str, value: &str, now_ms: i64) -> Result<(), StorageError> {
    let list = list_entry(map, key, now_ms)?;
    list.push_back(value.to_string());
    Ok(())
}

fn op_ltrim(
    map: &mut Map,
    key: &str,
    start: i64,
    stop: i64,
    now_ms: i64,
) -> Result<(), StorageError> {
    drop_if_expired(map, key, now_ms);
    let emptied = match map.get_mut(key) {
        None => return Ok(()),
        Some(entry) => {
            let list = match &mut entry.value {
                Value::List(list) => list,
                _ => return Err(StorageError::new("wrong type")),
            };
            match normalize_range(list.len(), start, stop) {
                Some((from, to)) => {
                    list.truncate(to + 1);
                    list.drain(..from);
                    false
                }
                None => true,
            }
        }
    };
    if emptied {
        map.remove(key);
    }
    Ok(())
}

fn op_set(map: &mut Map, key: &str, value: &str, expires_at_ms: Option<i64>) {
    map.insert(
        key.to_string(),
        Entry {
            value: Value::Str(value.to_string()),
            expires_at_ms,
        },
    );
}

fn op_expire(map: &mut Map, key: &str, ttl_seconds: u64, now_ms: i64) {
    drop_if_expired(map, key, now_ms);
    if let Some(entry) = map.get_mut(key) {
        entry.expires_at_ms = Some(now_ms + (ttl_seconds as i64) * 1000);
    }
}

fn op_hset_all(
    map: &mut Map,
    key: &str,
    fields: &[(String, String)],
    now_ms: i64,
) -> Result<(), StorageError> {
    drop_if_expired(map, key, now_ms);
    let entry = map.entry(key.to_string()).or_insert_with(|| Entry {
        value: Value::Hash(HashMap::new()),
        expires_at_ms: None,
    });
    let hash = match &mut entry.value {
        Value::Hash(hash) => hash,
        _ => return Err(StorageError::new("wrong type")),
    };
    for (field, value) in fields {
        hash.insert(field.clone(), value.clone());
    }
    Ok(())
}

fn apply(map: &mut Map, op: &KvOp, now_ms: i64) -> Result<(), StorageError> {
    match op {
        KvOp::Set { key, value } => {
            op_set(map, key, value, None);
            Ok(())
        }
        KvOp::SetEx {
            key,
            value,
            ttl_seconds,
        } => {
            op_set(map, key, value, Some(now_ms + (*ttl_seconds as i64) * 1000));
            Ok(())
        }
        KvOp::Del { key } => {
            map.remove(key.as_str());
            Ok(())
        }
        KvOp::Expire { key, ttl_seconds } => {
            op_expire(map, key, *ttl_seconds, now_ms);
            Ok(())
        }
        KvOp::LPush { key, values } => op_lpush(map, key, values, now_ms),
        KvOp::RPush { key, value } => op_rpush(map, key, value, now_ms),
        KvOp::LTrim { key, start, stop } => op_ltrim(map, key, *start, *stop, now_ms),
        KvOp::HSetAll { key, fields } => op_hset_all(map, key, fields, now_ms),
    }
}

/// 键值存储内存实现。
pub struct InMemoryKvStore {
    data: RwLock<Map>,
    clock_offset_ms: AtomicI64,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock_offset_ms: AtomicI64::new(0),
        }
    }

    /// 将测试时钟前移指定秒数（仅用于测试过期语义）。
    pub fn advance_secs(&self, seconds: u64) {
        self.clock_offset_ms
            .fetch_add((seconds as i64) * 1000, Ordering::Relaxed);
    }

    fn now_ms(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        wall + self.clock_offset_ms.load(Ordering::Relaxed)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Map>, StorageError> {
        self.data.read().map_err(|_| StorageError::new("lock failed"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Map>, StorageError> {
        self.data
            .write()
            .map_err(|_| StorageError::new("lock failed"))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = self.now_ms();
        let map = self.read()?;
        match live(&map, key, now) {
            Some(entry) => match &entry.value {
                Value::Str(value) => Ok(Some(value.clone())),
                _ => Err(StorageError::new("wrong type")),
            },
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.write()?;
        op_set(&mut map, key, value, None);
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        op_set(&mut map, key, value, Some(now + (ttl_seconds as i64) * 1000));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.write()?;
        map.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        op_expire(&mut map, key, ttl_seconds, now);
        Ok(())
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        drop_if_expired(&mut map, key, now);
        let (current, expires_at_ms) = match map.get(key) {
            Some(entry) => match &entry.value {
                Value::Str(value) => {
                    let parsed = value
                        .parse::<f64>()
                        .map_err(|_| StorageError::new("value is not a valid float"))?;
                    (parsed, entry.expires_at_ms)
                }
                _ => return Err(StorageError::new("wrong type")),
            },
            None => (0.0, None),
        };
        let updated = current + delta;
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Str(format!("{}", updated)),
                expires_at_ms,
            },
        );
        Ok(updated)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let now = self.now_ms();
        let mut map = self.write()?;
        op_lpush(&mut map, key, values, now)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        op_rpush(&mut map, key, value, now)
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        op_ltrim(&mut map, key, start, stop, now)
    }

    async fn lrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StorageError> {
        let now = self.now_ms();
        let map = self.read()?;
        let Some(entry) = live(&map, key, now) else {
            return Ok(Vec::new());
        };
        let list = match &entry.value {
            Value::List(list) => list,
            _ => return Err(StorageError::new("wrong type")),
        };
        match normalize_range(list.len(), start, stop) {
            Some((from, to)) => Ok(list.iter().skip(from).take(to - from + 1).cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, StorageError> {
        let now = self.now_ms();
        let map = self.read()?;
        let Some(entry) = live(&map, key, now) else {
            return Ok(None);
        };
        let list = match &entry.value {
            Value::List(list) => list,
            _ => return Err(StorageError::new("wrong type")),
        };
        let len = list.len() as i64;
        let index = if index < 0 { len + index } else { index };
        if index < 0 || index >= len {
            return Ok(None);
        }
        Ok(list.get(index as usize).cloned())
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        drop_if_expired(&mut map, key, now);
        let (popped, emptied) = match map.get_mut(key) {
            None => return Ok(None),
            Some(entry) => {
                let list = match &mut entry.value {
                    Value::List(list) => list,
                    _ => return Err(StorageError::new("wrong type")),
                };
                let popped = list.pop_front();
                (popped, list.is_empty())
            }
        };
        if emptied {
            map.remove(key);
        }
        Ok(popped)
    }

    async fn hset_all(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        let now = self.now_ms();
        let mut map = self.write()?;
        op_hset_all(&mut map, key, fields, now)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let now = self.now_ms();
        let map = self.read()?;
        match live(&map, key, now) {
            Some(entry) => match &entry.value {
                Value::Hash(hash) => Ok(hash.clone()),
                _ => Err(StorageError::new("wrong type")),
            },
            None => Ok(HashMap::new()),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let now = self.now_ms();
        let map = self.read()?;
        Ok(map
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn multi(&self, ops: &[KvOp]) -> Result<(), StorageError> {
        let now = self.now_ms();
        let mut map = self.write()?;
        for op in ops {
            apply(&mut map, op, now)?;
        }
        Ok(())
    }
}
