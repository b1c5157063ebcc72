//! Long-polling loop: pulls Bot API updates and spawns one dispatcher task
//! per event.

use std::sync::Arc;
use std::time::Duration;

use tryst_shared::clients::telegram::{TelegramClient, Update};

use super::telegram::event_from_update;
use crate::{dispatcher, AppState};

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Offset acknowledging every update in `updates`.
fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .max()
        .map_or(current, |next| next.max(current))
}

/// Runs until the task is dropped. Transport errors are logged and retried.
pub async fn run(client: TelegramClient, state: Arc<AppState>) -> anyhow::Result<()> {
    let timeout = state.config.poll_timeout();
    let mut offset = 0;
    tracing::info!(timeout_secs = timeout.as_secs(), "polling for updates");

    loop {
        let updates = match client.get_updates(offset, timeout).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, retry_in_secs = RETRY_DELAY.as_secs(), "getUpdates failed");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };
        offset = next_offset(offset, &updates);

        for update in updates {
            let update_id = update.update_id;
            match event_from_update(update) {
                Some(event) => {
                    tokio::spawn(dispatcher::handle(state.clone(), event));
                }
                None => tracing::debug!(update_id, "update ignored"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(id: i64) -> Update {
        serde_json::from_value(serde_json::json!({ "update_id": id })).unwrap()
    }

    #[test]
    fn offset_moves_past_the_newest_update() {
        assert_eq!(next_offset(0, &[update(10), update(12), update(11)]), 13);
    }

    #[test]
    fn empty_batch_keeps_offset() {
        assert_eq!(next_offset(42, &[]), 42);
    }
}
