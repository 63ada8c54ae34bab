use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::{EphemeralStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process store for single-instance deployments and tests.
///
/// Expiry is checked lazily on every access; [`MemoryStore::spawn_sweeper`] additionally
/// reclaims keys nobody reads again. Time comes from `tokio::time`, so a paused test clock
/// drives expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drops every expired key. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.lock().await;
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        before - guard.len()
    }

    /// Number of keys currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sweeps on a fixed interval until the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep().await;
                if removed > 0 {
                    debug!(removed, "swept expired keys");
                }
            }
        })
    }
}

/// Looks up `key`, evicting it first if its expiry has passed.
fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut guard = self.entries.lock().await;
        match live_entry(&mut guard, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let entry = Entry {
            value: Value::Text(value),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn push(&self, key: &str, value: String) -> StoreResult<usize> {
        let mut guard = self.entries.lock().await;
        match live_entry(&mut guard, key) {
            Some(Entry {
                value: Value::List(items),
                ..
            }) => {
                items.push(value);
                Ok(items.len())
            }
            Some(_) => Err(wrong_type(key)),
            None => {
                guard.insert(
                    key.to_string(),
                    Entry {
                        value: Value::List(vec![value]),
                        expires_at: None,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let mut guard = self.entries.lock().await;
        match live_entry(&mut guard, key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut guard = self.entries.lock().await;
        match live_entry(&mut guard, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(items),
                ..
            }) => Ok(items.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test_timeout::tokio_timeout_test]
    async fn set_ex_overwrites_and_expires() {
        tokio::time::pause();
        let store = MemoryStore::new();
        store.set_ex("k", "one".into(), TTL).await.unwrap();
        store.set_ex("k", "two".into(), TTL).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

        tokio::time::advance(TTL).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[test_timeout::tokio_timeout_test]
    async fn push_keeps_order_and_expire_slides() {
        tokio::time::pause();
        let store = MemoryStore::new();
        assert_eq!(store.push("l", "a".into()).await.unwrap(), 1);
        assert_eq!(store.push("l", "b".into()).await.unwrap(), 2);
        assert!(store.expire("l", TTL).await.unwrap());

        tokio::time::advance(Duration::from_secs(45)).await;
        store.push("l", "c".into()).await.unwrap();
        assert!(store.expire("l", TTL).await.unwrap());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(store.list("l").await.unwrap(), vec!["a", "b", "c"]);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(store.list("l").await.unwrap().is_empty());
    }

    #[test_timeout::tokio_timeout_test]
    async fn pushed_list_without_expire_never_expires() {
        tokio::time::pause();
        let store = MemoryStore::new();
        store.push("l", "a".into()).await.unwrap();
        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert_eq!(store.list("l").await.unwrap(), vec!["a"]);
    }

    #[test_timeout::tokio_timeout_test]
    async fn expire_on_missing_key_reports_absent() {
        let store = MemoryStore::new();
        assert!(!store.expire("nope", TTL).await.unwrap());
        assert!(store.list("nope").await.unwrap().is_empty());
    }

    #[test_timeout::tokio_timeout_test]
    async fn mixing_kinds_is_a_type_error() {
        let store = MemoryStore::new();
        store.set_ex("s", "text".into(), TTL).await.unwrap();
        store.push("l", "item".into()).await.unwrap();

        assert!(matches!(
            store.push("s", "x".into()).await,
            Err(StoreError::WrongType { key }) if key == "s"
        ));
        assert!(matches!(
            store.get("l").await,
            Err(StoreError::WrongType { .. })
        ));
        assert!(matches!(
            store.list("s").await,
            Err(StoreError::WrongType { .. })
        ));
    }

    #[test_timeout::tokio_timeout_test]
    async fn delete_removes_lists_and_text() {
        let store = MemoryStore::new();
        store.set_ex("s", "text".into(), TTL).await.unwrap();
        store.push("l", "item".into()).await.unwrap();
        store.delete("s").await.unwrap();
        store.delete("l").await.unwrap();
        store.delete("never-written").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[test_timeout::tokio_timeout_test]
    async fn sweep_reclaims_untouched_keys() {
        tokio::time::pause();
        let store = MemoryStore::new();
        store.set_ex("short", "x".into(), Duration::from_secs(1)).await.unwrap();
        store.set_ex("long", "y".into(), TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.sweep().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[test_timeout::tokio_timeout_test]
    async fn sweeper_task_runs_on_interval() {
        tokio::time::pause();
        let store = MemoryStore::new();
        store.set_ex("short", "x".into(), Duration::from_secs(1)).await.unwrap();
        let handle = store.spawn_sweeper(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(store.is_empty().await);
        handle.abort();
    }
}
