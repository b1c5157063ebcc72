use std::sync::Arc;

use tryst_shared::clients::redis::RedisClient;
use tryst_shared::clients::telegram::TelegramClient;

use tryst_bot::config::AppConfig;
use tryst_bot::store::{DocumentStore, MemoryStore, RedisStore};
use tryst_bot::transport::poller;
use tryst_bot::transport::telegram::TelegramMessenger;
use tryst_bot::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tryst_shared::middleware::init_tracing("tryst-bot");

    let config = AppConfig::load()?;
    if config.telegram_token.is_empty() {
        anyhow::bail!("TRYST__TELEGRAM_TOKEN is not set");
    }
    let port = config.port;

    let store: Arc<dyn DocumentStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::new(RedisClient::connect(url).await?)),
        None => {
            tracing::warn!("TRYST__REDIS_URL not set, using the in-process store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let client = TelegramClient::new(config.telegram_token.clone());
    let messenger = Arc::new(TelegramMessenger::new(client.clone()));
    let metrics = tryst_shared::middleware::init_metrics()?;

    let state = Arc::new(AppState::new(config, store, messenger, metrics)?);

    let resumed = state.wizard.resume().await?;
    tracing::info!(resumed, "wizard sessions restored");

    let app = routes::router(state.clone());
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "tryst-bot starting");

    tokio::select! {
        res = poller::run(client, state) => res?,
        res = axum::serve(listener, app) => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown requested"),
    }

    Ok(())
}
