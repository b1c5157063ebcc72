use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tryst_shared::errors::AppResult;

use super::DocumentStore;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process backend. Expiry is evaluated lazily on access against the
/// tokio clock, so paused-time tests see keys expire.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> AppResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let now = Instant::now();
        self.entries.retain(|_, e| e.is_live(now));
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() {
        let store = MemoryStore::new();
        store.set("account:1", "{}".into(), None).await.unwrap();
        assert_eq!(store.get("account:1").await.unwrap().as_deref(), Some("{}"));

        store.delete("account:1").await.unwrap();
        assert!(store.get("account:1").await.unwrap().is_none());
        store.delete("account:1").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn keys_expire_after_ttl() {
        let store = MemoryStore::new();
        store.set("compose:1", "x".into(), Some(Duration::from_secs(10))).await.unwrap();
        store.set("compose:2", "y".into(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.get("compose:1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("compose:1").await.unwrap().is_none());
        assert_eq!(store.list_keys("compose:").await.unwrap(), vec!["compose:2".to_string()]);
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let store = MemoryStore::new();
        for key in ["account:1", "account:2", "wizard:1", "data"] {
            store.set(key, "v".into(), None).await.unwrap();
        }
        let mut keys = store.list_keys("account:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["account:1", "account:2"]);
    }
}
