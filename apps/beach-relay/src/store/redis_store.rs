use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::{EphemeralStore, StoreResult};

/// Redis-backed store; lets any number of relay instances share room state.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }
}

// Redis rejects a zero expiry, so sub-second TTLs round up.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn push(&self, key: &str, value: String) -> StoreResult<usize> {
        let mut conn = self.redis.clone();
        let len: usize = conn.rpush(key, value).await?;
        Ok(len)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.redis.clone();
        let applied: bool = conn.expire(key, ttl_secs(ttl) as i64).await?;
        Ok(applied)
    }

    async fn list(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.redis.clone();
        let items: Vec<String> = conn.lrange(key, 0, -1).await?;
        Ok(items)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
