use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tryst_shared::errors::{AppError, AppResult};

use super::DocumentStore;

/// Typed JSON documents over a [`DocumentStore`].
///
/// Every mutation goes through [`Documents::modify`], which holds a per-key
/// async mutex across the read, the transform and the write. Two transforms
/// on the same key therefore never interleave; transforms on different keys
/// run concurrently.
#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn backend(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|e| {
                tracing::error!(key, error = %e, "stored document does not match its type");
                AppError::Serialization(e)
            }),
            None => Ok(None),
        }
    }

    /// Unconditional write. Only for keys with a single writer; shared
    /// documents must use [`Documents::modify`].
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw, ttl).await
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.store.delete(key).await
    }

    pub async fn list_keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        self.store.list_keys(prefix).await
    }

    /// Atomic read-modify-write of one key.
    ///
    /// `f` receives the current value and returns the next value (`None`
    /// deletes the key) together with a result for the caller. If `f` fails
    /// nothing is written.
    pub async fn modify<T, R, F>(&self, key: &str, ttl: Option<Duration>, f: F) -> AppResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> AppResult<(Option<T>, R)>,
    {
        let lock = self.lock_for(key);
        let result = {
            let _guard = lock.lock().await;
            self.transform(key, ttl, f).await
        };
        // Drop the mutex from the map once nobody else is queued on it.
        self.locks.remove_if(key, |_, l| Arc::strong_count(l) == 2);
        result
    }

    /// [`Documents::modify`] for documents that always exist, starting from
    /// `T::default()`.
    pub async fn update<T, R, F>(&self, key: &str, ttl: Option<Duration>, f: F) -> AppResult<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> AppResult<R>,
    {
        self.modify(key, ttl, |current: Option<T>| {
            let mut doc = current.unwrap_or_default();
            let out = f(&mut doc)?;
            Ok((Some(doc), out))
        })
        .await
    }

    async fn transform<T, R, F>(&self, key: &str, ttl: Option<Duration>, f: F) -> AppResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> AppResult<(Option<T>, R)>,
    {
        let current = self.get::<T>(key).await?;
        let (next, out) = f(current)?;
        match next {
            Some(value) => self.put(key, &value, ttl).await?,
            None => self.store.delete(key).await?,
        }
        Ok(out)
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tryst_shared::errors::ErrorCode;

    fn docs() -> Documents {
        Documents::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let docs = docs();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let docs = docs.clone();
            handles.push(tokio::spawn(async move {
                docs.update("counter", None, |n: &mut u64| {
                    *n += 1;
                    Ok(())
                })
                .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(docs.get::<u64>("counter").await.unwrap(), Some(50));
        assert!(docs.locks.is_empty());
    }

    #[tokio::test]
    async fn failed_transform_writes_nothing() {
        let docs = docs();
        docs.put("k", &vec![1u32], None).await.unwrap();

        let err = docs
            .update("k", None, |v: &mut Vec<u32>| -> AppResult<()> {
                v.push(2);
                Err(AppError::new(ErrorCode::AlreadyLiked, "nope"))
            })
            .await
            .unwrap_err();
        assert!(err.is(ErrorCode::AlreadyLiked));
        assert_eq!(docs.get::<Vec<u32>>("k").await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn returning_none_deletes() {
        let docs = docs();
        docs.put("k", &"v", None).await.unwrap();
        let old = docs
            .modify("k", None, |cur: Option<String>| Ok((None, cur)))
            .await
            .unwrap();
        assert_eq!(old.as_deref(), Some("v"));
        assert!(docs.get::<String>("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_document_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        store.set("account:1", "not json".into(), None).await.unwrap();
        let docs = Documents::new(store);
        let err = docs.get::<u64>("account:1").await.unwrap_err();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
