//! Redis streams client

use super::client::StreamClient;
use crate::backend::BackendKind;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamMaxlen, StreamRangeReply};
use redis::AsyncCommands;
use tracing::{debug, info};

const SCAN_COUNT: usize = 500;

/// Client for a Redis server
pub struct RedisStreamClient {
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl std::fmt::Debug for RedisStreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamClient")
            .field("open", &self.connection.lock().is_some())
            .finish()
    }
}

fn redis_error(err: redis::RedisError) -> StorageError {
    StorageError::backend(BackendKind::Redis, err.to_string())
}

/// Escape glob metacharacters so a key prefix matches literally in `SCAN MATCH`
fn glob_escape(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('*');
    out
}

impl RedisStreamClient {
    /// Connect to `url` (`redis://host:port/db`)
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(redis_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_error)?;
        info!(url, "connected to redis");
        Ok(Self {
            connection: Mutex::new(Some(connection)),
        })
    }

    fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .lock()
            .clone()
            .ok_or(StorageError::Closed(BackendKind::Redis))
    }
}

#[async_trait]
impl StreamClient for RedisStreamClient {
    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection()?;
        let pattern = glob_escape(prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(redis_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn add(&self, key: &str, field: &str, value: &str, max_len: Option<usize>) -> Result<()> {
        let mut conn = self.connection()?;
        let items = [(field, value)];
        let _id: String = match max_len {
            Some(max) => conn
                .xadd_maxlen(key, StreamMaxlen::Approx(max), "*", &items)
                .await
                .map_err(redis_error)?,
            None => conn.xadd(key, "*", &items).await.map_err(redis_error)?,
        };
        Ok(())
    }

    async fn range(&self, key: &str, field: &str) -> Result<Vec<String>> {
        let mut conn = self.connection()?;
        let reply: StreamRangeReply = conn.xrange_all(key).await.map_err(redis_error)?;
        Ok(reply
            .ids
            .iter()
            .filter_map(|entry| entry.get::<String>(field))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection()?;
        let _removed: i64 = conn.del(key).await.map_err(redis_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.connection.lock().take().is_some() {
            debug!("redis connection closed");
        }
        Ok(())
    }
}
