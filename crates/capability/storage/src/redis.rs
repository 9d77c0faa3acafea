//! Redis 键值原语实现

use crate::error::StorageError;
use crate::kv::{KvOp, KvStore};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;

/// Redis 键值存储。
pub struct RedisKvStore {
    client: redis::Client,
}

impl RedisKvStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }

    async fn conn(&self) -> Result<MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }
}

#[async_trait::async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn().await?;
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.expire::<_, ()>(key, ttl_seconds as i64).await?;
        Ok(())
    }

    async fn incr_by_float(&self, key: &str, delta: f64) -> Result<f64, StorageError> {
        let mut conn = self.conn().await?;
        let value: f64 = redis::cmd("INCRBYFLOAT")
            .arg(key)
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> Result<(), StorageError> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.lpush::<_, _, ()>(key, values.to_vec()).await?;
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.rpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn ltrim(&self, key: &str, start: i64, stop: i64) -> Result<(), StorageError> {
        let mut conn = self.conn().await?;
        conn.ltrim::<_, ()>(key, start as isize, stop as isize)
            .await?;
        Ok(())
    }

    async fn lrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, StorageError> {
        let mut conn = self.conn().await?;
        Ok(conn.lrange(key, start as isize, stop as isize).await?)
    }

    async fn lindex(&self, key: &str, index: i64) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn().await?;
        Ok(conn.lindex(key, index as isize).await?)
    }

    async fn lpop(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn().await?;
        Ok(conn.lpop(key, None).await?)
    }

    async fn hset_all(
        &self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let mut conn = self.conn().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(keys)
    }

    async fn multi(&self, ops: &[KvOp]) -> Result<(), StorageError> {
        if ops.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            match op {
                KvOp::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                KvOp::SetEx {
                    key,
                    value,
                    ttl_seconds,
                } => {
                    pipe.set_ex(key, value, *ttl_seconds).ignore();
                }
                KvOp::Del { key } => {
                    pipe.del(key).ignore();
                }
                KvOp::Expire { key, ttl_seconds } => {
                    pipe.expire(key, *ttl_seconds as i64).ignore();
                }
                KvOp::LPush { key, values } => {
                    if !values.is_empty() {
                        pipe.lpush(key, values.clone()).ignore();
                    }
                }
                KvOp::RPush { key, value } => {
                    pipe.rpush(key, value).ignore();
                }
                KvOp::LTrim { key, start, stop } => {
                    pipe.ltrim(key, *start as isize, *stop as isize).ignore();
                }
                KvOp::HSetAll { key, fields } => {
                    if !fields.is_empty() {
                        pipe.hset_multiple(key, fields).ignore();
                    }
                }
            }
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
