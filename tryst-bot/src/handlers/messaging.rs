//! Private messages between accounts, delivered to the recipient's inbox.

use chrono::Utc;
use metrics::counter;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use super::compose::{self, ComposeCursor};
use super::reactions::notifications_enabled;
use super::{show_text, toast, Caller};
use crate::models::{AccountId, Message};
use crate::notify::best_effort;
use crate::rate_limit::LimitedAction;
use crate::transport::{Button, Keyboard};
use crate::AppState;

const INBOX_PAGE: usize = 5;

fn cannot_message_self() -> AppError {
    AppError::new(ErrorCode::CannotMessageSelf, "You can't message yourself!")
}

/// The `message:{owner}` button: waits for the text to send.
pub async fn begin(state: &AppState, caller: &Caller, target: AccountId) -> AppResult<()> {
    if target == caller.account_id {
        return Err(cannot_message_self());
    }
    compose::open(state, caller.account_id, ComposeCursor::Message { target }).await?;
    super::ack(state, caller).await;
    state
        .messenger
        .send_text(caller.chat_id, "💌 Write your message now:", None)
        .await?;
    Ok(())
}

pub async fn deliver(state: &AppState, caller: &Caller, target: AccountId, content: &str) -> AppResult<()> {
    let sender = caller.account_id;
    if target == sender {
        return Err(cannot_message_self());
    }
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("Empty messages can't be sent."));
    }
    state.filter.screen(content)?;
    state.limiter.hit(sender, LimitedAction::Message).await?;

    let message = Message {
        id: Uuid::new_v4(),
        sender_account_id: sender,
        content: content.to_string(),
        timestamp: Utc::now(),
        read: false,
    };
    state
        .repo
        .update_account(target, |account| {
            account.inbox.push(message);
            Ok(())
        })
        .await
        .map_err(|e| {
            if e.is(ErrorCode::AccountNotFound) {
                AppError::new(ErrorCode::AccountNotFound, "❌ That user no longer exists.")
            } else {
                e
            }
        })?;

    counter!("messages_sent_total").increment(1);
    tracing::info!(sender_id = sender, recipient_id = target, "message delivered");

    state
        .messenger
        .send_text(caller.chat_id, "✅ Message sent!", None)
        .await?;

    if notifications_enabled(state, target).await? {
        let keyboard = Keyboard::new().button("📬 Open inbox", "inbox");
        best_effort(
            "message notice",
            target,
            state
                .messenger
                .send_text(target, "💌 You have a new message! Check your inbox.", Some(keyboard)),
        )
        .await;
    }
    Ok(())
}

/// Shows the newest messages and marks the whole inbox read.
pub async fn inbox(state: &AppState, caller: &Caller) -> AppResult<()> {
    let shown = state
        .repo
        .update_account(caller.account_id, |account| {
            let start = account.inbox.len().saturating_sub(INBOX_PAGE);
            let shown = account.inbox[start..].to_vec();
            account.inbox.iter_mut().for_each(|m| m.read = true);
            Ok(shown)
        })
        .await?;

    if shown.is_empty() {
        return toast(state, caller, "📭 Your inbox is empty.", true).await;
    }

    let mut text = String::from("💬 Inbox:\n\n");
    let mut keyboard = Keyboard::new();
    for (i, m) in shown.iter().enumerate() {
        let marker = if m.read { "📩" } else { "🆕" };
        text.push_str(&format!(
            "{marker} From: {}\n{}\n🕒 {}\n\n",
            m.sender_account_id,
            m.content,
            m.timestamp.format("%Y-%m-%d %H:%M")
        ));
        keyboard = keyboard.row(vec![Button::new(
            format!("↩️ Reply {}", i + 1),
            format!("message:{}", m.sender_account_id),
        )]);
    }
    keyboard = keyboard.button("🔙 Back", "start");
    show_text(state, caller, &text, Some(keyboard)).await
}
