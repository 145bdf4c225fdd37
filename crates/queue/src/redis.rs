//! Redis-backed [`KvStore`].
//!
//! Plain values use `GET`/`SET`/`DEL`. Leases are a string key holding the
//! owner id with a millisecond TTL; acquire and release run as Lua scripts so
//! the owner check and the write happen in one round-trip.

use std::time::Duration;

use ::redis::aio::MultiplexedConnection;
use ::redis::{AsyncCommands, Script};
use async_trait::async_trait;

use crate::store::{KvError, KvStore};

/// Take the lease if free or already ours, and (re)set its TTL.
///
/// KEYS[1] = lease key. ARGV[1] = owner id, ARGV[2] = TTL in milliseconds.
/// Returns 1 on success, 0 if held by someone else.
const LUA_ACQUIRE_LEASE: &str = r#"
local holder = redis.call('GET', KEYS[1])
if (not holder) or holder == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[1], 'PX', tonumber(ARGV[2]))
    return 1
end
return 0
"#;

/// Delete the lease only if `owner` holds it.
///
/// KEYS[1] = lease key. ARGV[1] = owner id.
const LUA_RELEASE_LEASE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis key-value store sharing one multiplexed connection.
///
/// Cloning is cheap; all clones share the same TCP connection.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: MultiplexedConnection,
}

impl RedisKvStore {
    /// Connect to Redis at `url` (`redis://[:<password>@]<host>:<port>[/<db>]`).
    pub async fn connect(url: &str) -> Result<Self, KvError> {
        let client = ::redis::Client::open(url)
            .map_err(|e| KvError::InvalidUrl(format!("{url}: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| KvError::Backend(format!("failed to connect to Redis: {e}")))?;
        Ok(Self { conn })
    }

    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

fn map_redis_error(err: ::redis::RedisError, key: &str) -> KvError {
    KvError::Backend(format!("Redis error for key {key}: {err}"))
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| map_redis_error(e, key))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| map_redis_error(e, key))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| map_redis_error(e, key))
    }

    async fn acquire_lease(
        &self,
        key: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let acquired: i64 = Script::new(LUA_ACQUIRE_LEASE)
            .key(key)
            .arg(owner)
            .arg(ttl_ms)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_redis_error(e, key))?;
        Ok(acquired == 1)
    }

    async fn release_lease(&self, key: &str, owner: &str) -> Result<(), KvError> {
        let _: i64 = Script::new(LUA_RELEASE_LEASE)
            .key(key)
            .arg(owner)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(|e| map_redis_error(e, key))?;
        Ok(())
    }
}
