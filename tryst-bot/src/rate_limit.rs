//! Fixed-window limits on user actions, stored under `rate_limit:{id}:{action}`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tryst_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::AccountId;
use crate::repository::rate_limit_key;
use crate::store::Documents;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedAction {
    Like,
    Message,
    ProfileView,
}

impl LimitedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitedAction::Like => "like",
            LimitedAction::Message => "message",
            LimitedAction::ProfileView => "profile_view",
        }
    }

    /// (max actions, window)
    pub fn limit(&self) -> (u32, Duration) {
        match self {
            LimitedAction::Like => (50, Duration::hours(24)),
            LimitedAction::Message => (20, Duration::hours(1)),
            LimitedAction::ProfileView => (100, Duration::hours(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowRecord {
    count: u32,
    window_start: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RateLimiter {
    docs: Documents,
}

impl RateLimiter {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    /// Counts one attempt and fails with `RateLimited` once the window's
    /// budget is exceeded. Refused attempts still count.
    pub async fn hit(&self, account: AccountId, action: LimitedAction) -> AppResult<()> {
        self.hit_at(account, action, Utc::now()).await
    }

    async fn hit_at(&self, account: AccountId, action: LimitedAction, now: DateTime<Utc>) -> AppResult<()> {
        let (max, window) = action.limit();
        let ttl = window.to_std().ok();

        let count = self
            .docs
            .modify(&rate_limit_key(account, action.as_str()), ttl, |current: Option<WindowRecord>| {
                let next = match current {
                    Some(rec) if now - rec.window_start < window => WindowRecord {
                        count: rec.count.saturating_add(1),
                        window_start: rec.window_start,
                    },
                    _ => WindowRecord { count: 1, window_start: now },
                };
                let count = next.count;
                Ok((Some(next), count))
            })
            .await?;

        if count > max {
            tracing::info!(account_id = account, action = action.as_str(), count, "rate limited");
            return Err(AppError::new(
                ErrorCode::RateLimited,
                "⏳ You've hit the limit for this action. Please wait a bit.",
            ));
        }
        Ok(())
    }
}
