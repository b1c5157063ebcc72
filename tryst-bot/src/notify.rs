use std::future::Future;

use tryst_shared::errors::AppResult;

use crate::models::AccountId;

/// Awaits a send whose failure must not fail the surrounding operation, such
/// as telling a third party about something that already happened.
pub async fn best_effort<T>(what: &str, recipient: AccountId, send: impl Future<Output = AppResult<T>>) -> Option<T> {
    match send.await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(recipient, error = %e, "failed to deliver {what}");
            None
        }
    }
}
