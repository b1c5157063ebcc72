//! Key-value persistence. Values are opaque strings at this layer; typed
//! access and atomic read-modify-write live in [`Documents`].

mod documents;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use tryst_shared::errors::AppResult;

pub use documents::Documents;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Writes `value`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> AppResult<()>;

    /// Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Live keys starting with `prefix`, in no particular order.
    async fn list_keys(&self, prefix: &str) -> AppResult<Vec<String>>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
