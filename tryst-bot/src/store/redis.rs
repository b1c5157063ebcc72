use std::time::Duration;

use async_trait::async_trait;
use tryst_shared::clients::redis::RedisClient;
use tryst_shared::errors::AppResult;

use super::DocumentStore;

/// Redis backend. Atomicity of read-modify-write is provided by the
/// in-process locks in `Documents`, so one bot process owns a keyspace.
#[derive(Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.client.get(key).await?)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> AppResult<()> {
        Ok(self.client.set(key, &value, ttl).await?)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        Ok(self.client.del(key).await?)
    }

    async fn list_keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        Ok(self.client.scan_prefix(prefix).await?)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(self.client.ping().await?)
    }
}
