//! Ephemeral key-value storage behind the relay.
//!
//! Every piece of room state lives in an [`EphemeralStore`]; the relay itself keeps nothing
//! between requests. Each call is expected to be atomic on its own key, nothing more.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, StoreBackend};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("key {key} holds the wrong kind of value")]
    WrongType { key: String },
    #[error("stored payload is not valid json: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Expiring dictionary with list support.
///
/// Expired keys must read exactly like keys that were never written.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Overwrites `key` (whatever it held) and sets its expiry to `ttl` from now.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Appends to the list at `key`, creating it without an expiry if absent.
    /// Returns the list length after the append.
    async fn push(&self, key: &str, value: String) -> StoreResult<usize>;

    /// Resets the expiry of an existing key. Returns false when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Full contents of the list at `key` in append order; empty when absent.
    async fn list(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Short label for logs and health output.
    fn backend_name(&self) -> &'static str;
}

pub type StoreHandle = Arc<dyn EphemeralStore>;

pub async fn build_store(cfg: &AppConfig) -> anyhow::Result<StoreHandle> {
    match cfg.store_backend {
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            if let Some(interval) = cfg.sweep_interval {
                let _sweeper = store.spawn_sweeper(interval);
                info!(interval_secs = interval.as_secs(), "memory store sweeper started");
            }
            let handle: StoreHandle = store;
            Ok(handle)
        }
        StoreBackend::Redis => {
            let url = cfg
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("BEACH_RELAY_STORE=redis requires REDIS_URL"))?;
            let handle: StoreHandle = Arc::new(RedisStore::connect(url).await?);
            Ok(handle)
        }
    }
}
