use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tryst_shared::types::auth::DEV_JWT_SECRET;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub telegram_token: String,
    /// Comma separated in the environment: `TRYST__ADMIN_IDS=11,22`.
    #[serde(default, deserialize_with = "comma_separated_ids")]
    pub admin_ids: Vec<i64>,
    /// Absent means the in-process store.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_wizard_timeout")]
    pub wizard_timeout_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub admin_token_ttl_secs: i64,
}

fn default_port() -> u16 { 3010 }
fn default_wizard_timeout() -> u64 { 60 }
fn default_poll_timeout() -> u64 { 30 }
fn default_jwt_secret() -> String { DEV_JWT_SECRET.into() }
fn default_token_ttl() -> i64 { 3600 }

fn comma_separated_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(serde::de::Error::custom))
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            telegram_token: String::new(),
            admin_ids: Vec::new(),
            redis_url: None,
            wizard_timeout_secs: default_wizard_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            jwt_secret: default_jwt_secret(),
            admin_token_ttl_secs: default_token_ttl(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_source(None)
    }

    fn from_source(source: Option<config::Map<String, String>>) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("TRYST")
                    .separator("__")
                    .source(source),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn is_admin(&self, account_id: i64) -> bool {
        self.admin_ids.contains(&account_id)
    }

    pub fn wizard_timeout(&self) -> Duration {
        Duration::from_secs(self.wizard_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}
