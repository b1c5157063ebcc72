//! Routes inbound events to the wizard, open compose cursors, commands and
//! button handlers. Errors stop here: users see a notice, never a failure.

use std::sync::Arc;

use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::handlers::{
    self, admin, browse, compose, messaging, profile, reactions, settings, start, toast, Caller,
};
use crate::models::AccountId;
use crate::notify::best_effort;
use crate::transport::InboundEvent;
use crate::wizard::prompts;
use crate::AppState;

const BANNED: &str = "⛔ You are banned from using this bot.";
const GENERIC_FAILURE: &str = "❌ Something went wrong. Please try again.";
const UNKNOWN_INPUT: &str = "🤔 I didn't get that. Send /start to open the menu.";
const STALE_FORM: &str = "⌛ This form has expired. Tap \"Create / edit profile\" to start again.";
const STALE_BUTTON: &str = "This button is no longer active.";

/// Handles one event end to end. Spawned once per update.
pub async fn handle(state: Arc<AppState>, event: InboundEvent) {
    let caller = Caller::from_event(&event);
    if let Err(err) = route(&state, &caller, &event).await {
        report(&state, &caller, err).await;
    }
}

async fn route(state: &AppState, caller: &Caller, event: &InboundEvent) -> AppResult<()> {
    let account = state.repo.ensure_account(caller.account_id).await?;
    if account.banned {
        tracing::info!(account_id = caller.account_id, "event from banned account dropped");
        return Err(AppError::new(ErrorCode::AccountBanned, BANNED));
    }

    if state.wizard.handle(event).await? {
        return Ok(());
    }
    if compose::handle(state, event).await? {
        return Ok(());
    }

    match event {
        InboundEvent::Text { text, .. } => command(state, caller, text).await,
        InboundEvent::Photo { .. } => {
            tracing::debug!(account_id = caller.account_id, "photo outside the wizard ignored");
            Ok(())
        }
        InboundEvent::Action { tag, payload, .. } => action(state, caller, tag, payload).await,
    }
}

// --- Commands ---

async fn command(state: &AppState, caller: &Caller, text: &str) -> AppResult<()> {
    let word = text.split_whitespace().next().unwrap_or_default();
    // Group chats address commands as `/start@BotName`.
    let name = word.split('@').next().unwrap_or_default();

    match name {
        "/start" => start::welcome(state, caller).await,
        "/cancel" => cancel(state, caller).await,
        "/admin" => admin::panel(state, caller).await,
        "/token" => admin::issue_api_token(state, caller).await,
        _ => {
            state.messenger.send_text(caller.chat_id, UNKNOWN_INPUT, None).await?;
            Ok(())
        }
    }
}

async fn cancel(state: &AppState, caller: &Caller) -> AppResult<()> {
    let wizard = state.wizard.cancel(caller.account_id).await?;
    let composing = compose::take(state, caller.account_id).await?.is_some();
    let text = if wizard {
        prompts::CANCELLED
    } else if composing {
        "✖️ Cancelled."
    } else {
        prompts::NOTHING_TO_CANCEL
    };
    state.messenger.send_text(caller.chat_id, text, None).await?;
    Ok(())
}

// --- Buttons ---

fn profile_id(payload: &str) -> AppResult<Uuid> {
    payload
        .parse()
        .map_err(|_| AppError::bad_request("malformed profile reference"))
}

fn account_id(payload: &str) -> AppResult<AccountId> {
    payload
        .parse()
        .map_err(|_| AppError::bad_request("malformed account reference"))
}

async fn action(state: &AppState, caller: &Caller, tag: &str, payload: &str) -> AppResult<()> {
    tracing::debug!(account_id = caller.account_id, tag, payload, "action");

    match tag {
        "start" => start::home(state, caller).await,
        "explore" => browse::explore(state, caller, payload.parse().unwrap_or(0)).await,
        "matches" => browse::matches(state, caller).await,
        "view_profile" => browse::view_profile(state, caller, payload).await,
        "create_profile" => {
            handlers::ack(state, caller).await;
            state.wizard.start(caller.account_id, caller.chat_id).await
        }
        "react" => match payload.split_once(':') {
            Some(("like", id)) => reactions::like(state, caller, profile_id(id)?).await,
            _ => Err(AppError::bad_request(format!("unknown reaction: {payload}"))),
        },
        "favorite" => reactions::toggle_favorite(state, caller, profile_id(payload)?)
            .await
            .map(|_| ()),
        "favorites" => reactions::favorites(state, caller).await,
        "delete_favorite" => reactions::remove_favorite(state, caller, profile_id(payload)?).await,
        "delete_profile" => profile::delete_profile(state, caller, profile_id(payload)?).await,
        "message" => messaging::begin(state, caller, account_id(payload)?).await,
        "inbox" => messaging::inbox(state, caller).await,
        "settings" => settings::show(state, caller).await,
        "toggle_setting" => settings::toggle(state, caller, payload).await,
        "set_target_gender" => settings::set_target_gender(state, caller, payload).await,
        "approve" => {
            let id = profile_id(payload)?;
            state.moderator.approve(caller.account_id, id, caller.message).await?;
            toast(state, caller, "✅ Approved", false).await
        }
        "decline" => {
            let id = profile_id(payload)?;
            state.moderator.decline(caller.account_id, id, caller.message).await?;
            toast(state, caller, "❌ Declined", false).await
        }
        "admin" => admin::handle_action(state, caller, payload).await,
        "noop" => {
            handlers::ack(state, caller).await;
            Ok(())
        }
        // Wizard buttons pressed after their session ended.
        "gender" | "target" | "country" | "region" => toast(state, caller, STALE_FORM, true).await,
        other => {
            tracing::warn!(account_id = caller.account_id, tag = other, "unknown action tag");
            toast(state, caller, STALE_BUTTON, true).await
        }
    }
}

// --- Error boundary ---

async fn report(state: &AppState, caller: &Caller, err: AppError) {
    let text = if err.is_user_facing() {
        tracing::debug!(account_id = caller.account_id, error = %err, "request refused");
        err.to_string()
    } else {
        tracing::error!(account_id = caller.account_id, error = %err, "handler failed");
        GENERIC_FAILURE.to_string()
    };
    best_effort("error notice", caller.account_id, toast(state, caller, &text, true)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::repository::wizard_key;
    use crate::testing::{self, ADMIN};
    use crate::transport::recording::Sent;
    use crate::transport::ActionRef;
    use crate::wizard::{WizardSession, WizardStep};

    fn text(account: AccountId, t: &str) -> InboundEvent {
        InboundEvent::Text { account_id: account, chat_id: account, text: t.into(), sender_name: None }
    }

    fn press(account: AccountId, data: &str) -> InboundEvent {
        InboundEvent::action(account, account, ActionRef(format!("cb-{account}")), None, data, None)
    }

    fn last_answer(messenger: &crate::transport::recording::RecordingMessenger) -> (String, bool) {
        match messenger.answers().pop() {
            Some(Sent::Answer { text, alert, .. }) => (text.unwrap_or_default(), alert),
            other => panic!("expected an answer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_creates_account_and_shows_menu() {
        let (state, messenger) = testing::state();
        handle(state.clone(), text(1, "/start")).await;

        assert!(state.repo.account(1).await.unwrap().is_some());
        assert!(messenger.last_to(1).unwrap().keyboard().is_some());
    }

    #[tokio::test]
    async fn banned_account_is_refused() {
        let (state, messenger) = testing::state();
        state.repo.ensure_account(1).await.unwrap();
        state
            .repo
            .update_account(1, |a| {
                a.banned = true;
                Ok(())
            })
            .await
            .unwrap();

        let event = press(1, "create_profile");
        let err = route(&state, &Caller::from_event(&event), &event).await.unwrap_err();
        assert!(err.is(ErrorCode::AccountBanned));

        handle(state.clone(), event).await;
        let (text, alert) = last_answer(&messenger);
        assert_eq!(text, BANNED);
        assert!(alert);
        assert!(state.repo.documents().get::<WizardSession>(&wizard_key(1)).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn create_profile_button_opens_the_wizard() {
        let (state, _) = testing::state();
        handle(state.clone(), press(1, "create_profile")).await;
        handle(state.clone(), InboundEvent::Photo { account_id: 1, chat_id: 1, file_id: "f".into() }).await;

        let session: WizardSession = state.repo.documents().get(&wizard_key(1)).await.unwrap().unwrap();
        assert_eq!(session.step, WizardStep::AwaitAge);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_what_was_cancelled() {
        let (state, messenger) = testing::state();
        handle(state.clone(), text(1, "/cancel")).await;
        assert_eq!(messenger.last_to(1).unwrap().body(), prompts::NOTHING_TO_CANCEL);

        handle(state.clone(), press(1, "create_profile")).await;
        handle(state.clone(), text(1, "/cancel@TrystBot")).await;
        assert_eq!(messenger.last_to(1).unwrap().body(), prompts::CANCELLED);
    }

    #[tokio::test]
    async fn message_button_then_text_delivers() {
        let (state, _) = testing::state();
        state.repo.ensure_account(2).await.unwrap();

        handle(state.clone(), press(1, "message:2")).await;
        handle(state.clone(), text(1, "hello from the dispatcher")).await;

        let inbox = state.repo.account(2).await.unwrap().unwrap().inbox;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].content, "hello from the dispatcher");
    }

    #[tokio::test]
    async fn admin_approves_from_the_review_buttons() {
        let (state, messenger) = testing::state();
        let sub = fixtures::submission(1);
        state.repo.enqueue_submission(sub.clone()).await.unwrap();

        handle(state.clone(), press(2, &format!("approve:{}", sub.id()))).await;
        let (text, alert) = last_answer(&messenger);
        assert!(text.contains("only admins"));
        assert!(alert);
        assert_eq!(state.repo.list_pending().await.unwrap().len(), 1);

        handle(state.clone(), press(ADMIN, &format!("approve:{}", sub.id()))).await;
        assert!(state.repo.profile_by_owner(1).await.unwrap().is_some());
        assert_eq!(last_answer(&messenger).0, "✅ Approved");
    }

    #[tokio::test]
    async fn malformed_payload_is_a_notice() {
        let (state, messenger) = testing::state();
        handle(state.clone(), press(1, "react:like:not-a-uuid")).await;
        let (text, alert) = last_answer(&messenger);
        assert!(text.contains("malformed"));
        assert!(alert);
    }

    #[tokio::test]
    async fn stale_wizard_button_explains_itself() {
        let (state, messenger) = testing::state();
        handle(state.clone(), press(1, "gender:male")).await;
        assert_eq!(last_answer(&messenger).0, STALE_FORM);
    }

    #[tokio::test]
    async fn internal_errors_are_masked() {
        let (state, messenger) = testing::state();
        let caller = Caller::from_event(&press(1, "inbox"));
        report(&state, &caller, AppError::Internal(anyhow::anyhow!("redis exploded"))).await;
        assert_eq!(last_answer(&messenger).0, GENERIC_FAILURE);
    }
}
