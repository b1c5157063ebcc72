//! One-shot text input cursors under `compose:{account}`: the next plain text
//! from the account completes whatever the cursor was opened for.

use serde::{Deserialize, Serialize};
use tryst_shared::errors::AppResult;

use super::{admin, messaging, Caller};
use crate::models::AccountId;
use crate::repository::compose_key;
use crate::transport::InboundEvent;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComposeCursor {
    /// A private message to `target`.
    Message { target: AccountId },
    /// An account id or channel for an admin command.
    Admin { op: admin::AdminOp },
}

/// Opens a cursor that expires with the same timeout as a wizard step.
pub async fn open(state: &AppState, account: AccountId, cursor: ComposeCursor) -> AppResult<()> {
    state
        .repo
        .documents()
        .put(&compose_key(account), &cursor, Some(state.config.wizard_timeout()))
        .await
}

/// Removes and returns the account's cursor.
pub async fn take(state: &AppState, account: AccountId) -> AppResult<Option<ComposeCursor>> {
    state
        .repo
        .documents()
        .modify(&compose_key(account), None, |cur: Option<ComposeCursor>| Ok((None, cur)))
        .await
}

/// Offers a text event to the account's open cursor. Commands pass through
/// and leave the cursor in place.
pub async fn handle(state: &AppState, event: &InboundEvent) -> AppResult<bool> {
    let InboundEvent::Text { text, .. } = event else {
        return Ok(false);
    };
    if text.trim_start().starts_with('/') {
        return Ok(false);
    }
    let Some(cursor) = take(state, event.account_id()).await? else {
        return Ok(false);
    };

    let caller = Caller::from_event(event);
    match cursor {
        ComposeCursor::Message { target } => messaging::deliver(state, &caller, target, text).await?,
        ComposeCursor::Admin { op } => admin::apply(state, &caller, op, text).await?,
    }
    Ok(true)
}
