//! Interaction handlers behind the dispatcher. Each takes the shared state
//! and the [`Caller`] that triggered it, and renders its own reply.

pub mod admin;
pub mod browse;
pub mod compose;
pub mod messaging;
pub mod profile;
pub mod reactions;
pub mod settings;
pub mod start;

use tryst_shared::errors::AppResult;

use crate::models::AccountId;
use crate::notify::best_effort;
use crate::transport::{ActionRef, InboundEvent, Keyboard, MessageRef};
use crate::AppState;

/// Who triggered a handler and where the answer goes.
#[derive(Debug, Clone)]
pub struct Caller {
    pub account_id: AccountId,
    pub chat_id: i64,
    pub action: Option<ActionRef>,
    /// The message whose button was pressed.
    pub message: Option<MessageRef>,
    pub name: Option<String>,
}

impl Caller {
    pub fn from_event(event: &InboundEvent) -> Self {
        let message = match event {
            InboundEvent::Action { message_ref, .. } => *message_ref,
            _ => None,
        };
        Self {
            account_id: event.account_id(),
            chat_id: event.chat_id(),
            action: event.action_ref().cloned(),
            message,
            name: event.sender_name().map(str::to_string),
        }
    }

    /// How the caller is shown to other users.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("User {}", self.account_id))
    }
}

/// Short feedback: a toast on the pressed button, or a plain message.
pub async fn toast(state: &AppState, caller: &Caller, text: &str, alert: bool) -> AppResult<()> {
    match &caller.action {
        Some(action) => state.messenger.answer_action(action, Some(text), alert).await,
        None => state.messenger.send_text(caller.chat_id, text, None).await.map(|_| ()),
    }
}

/// Replaces the pressed message with a text screen, falling back to a new
/// message when there is nothing to edit or the edit fails.
pub async fn show_text(state: &AppState, caller: &Caller, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
    ack(state, caller).await;
    if let Some(message) = &caller.message {
        match state.messenger.edit_message(message, text, keyboard.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => tracing::debug!(error = %e, "edit failed, sending a new message"),
        }
    }
    state.messenger.send_text(caller.chat_id, text, keyboard).await.map(|_| ())
}

/// Sends a photo card as a new message.
pub async fn show_photo(
    state: &AppState,
    caller: &Caller,
    photo: &str,
    caption: &str,
    keyboard: Option<Keyboard>,
) -> AppResult<()> {
    ack(state, caller).await;
    state
        .messenger
        .send_photo(caller.chat_id, photo, caption, keyboard)
        .await
        .map(|_| ())
}

/// Stops the button's loading indicator.
pub(crate) async fn ack(state: &AppState, caller: &Caller) {
    if let Some(action) = &caller.action {
        best_effort("answer", caller.account_id, state.messenger.answer_action(action, None, false)).await;
    }
}
