pub mod config;
pub mod dispatcher;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod moderation;
pub mod notify;
pub mod rate_limit;
pub mod repository;
pub mod routes;
pub mod security;
pub mod store;
pub mod transport;
pub mod wizard;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tryst_shared::errors::AppResult;

use config::AppConfig;
use moderation::Moderator;
use rate_limit::RateLimiter;
use repository::Repository;
use security::ContentFilter;
use store::{DocumentStore, Documents};
use transport::Messenger;
use wizard::WizardEngine;

pub struct AppState {
    pub config: AppConfig,
    pub repo: Repository,
    pub messenger: Arc<dyn Messenger>,
    pub wizard: WizardEngine,
    pub moderator: Moderator,
    pub limiter: RateLimiter,
    pub filter: ContentFilter,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        messenger: Arc<dyn Messenger>,
        metrics: PrometheusHandle,
    ) -> AppResult<Self> {
        let docs = Documents::new(store);
        let repo = Repository::new(docs.clone());
        let wizard = WizardEngine::new(
            repo.clone(),
            messenger.clone(),
            config.admin_ids.clone(),
            config.wizard_timeout(),
        );
        let moderator = Moderator::new(repo.clone(), messenger.clone(), config.admin_ids.clone());

        Ok(Self {
            repo,
            wizard,
            moderator,
            limiter: RateLimiter::new(docs),
            filter: ContentFilter::default_rules()?,
            messenger,
            metrics,
            config,
        })
    }
}
