//! Likes and favorites.

use metrics::counter;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use super::{show_text, toast, Caller};
use crate::notify::best_effort;
use crate::rate_limit::LimitedAction;
use crate::transport::{Button, Keyboard};
use crate::AppState;

fn profile_gone() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "❌ This profile no longer exists.")
}

/// Likes a profile once per account. The liked-set entry is written before
/// the counter so a repeated like can never count twice.
pub async fn like(state: &AppState, caller: &Caller, profile_id: Uuid) -> AppResult<()> {
    let liker = caller.account_id;
    let profile = state.repo.profile_by_id(profile_id).await?.ok_or_else(profile_gone)?;

    if let Some(account) = state.repo.account(liker).await? {
        if account.liked_profile_ids.contains(&profile_id) {
            return Err(already_liked());
        }
    }
    state.limiter.hit(liker, LimitedAction::Like).await?;

    state
        .repo
        .update_account(liker, |account| {
            if !account.liked_profile_ids.insert(profile_id) {
                return Err(already_liked());
            }
            Ok(())
        })
        .await?;

    if state.repo.increment_likes(profile_id).await?.is_none() {
        tracing::warn!(account_id = liker, profile_id = %profile_id, "liked profile vanished before it was counted");
    }
    counter!("likes_total").increment(1);
    tracing::info!(account_id = liker, profile_id = %profile_id, "profile liked");

    toast(state, caller, "💖 Liked!", false).await?;

    let owner = profile.owner_account_id;
    if owner != liker && notifications_enabled(state, owner).await? {
        let keyboard = Keyboard::new().button("👀 View their profile", format!("view_profile:{liker}"));
        let text = format!("{} likes you 💘", caller.display_name());
        best_effort("like notice", owner, state.messenger.send_text(owner, &text, Some(keyboard))).await;
    }
    Ok(())
}

fn already_liked() -> AppError {
    AppError::new(ErrorCode::AlreadyLiked, "You already liked this profile.")
}

pub(crate) async fn notifications_enabled(state: &AppState, account: i64) -> AppResult<bool> {
    Ok(state
        .repo
        .account(account)
        .await?
        .map_or(false, |a| a.notification_opt_in))
}

/// Flips membership in the caller's favorites. Returns whether the profile
/// is a favorite afterwards.
pub async fn toggle_favorite(state: &AppState, caller: &Caller, profile_id: Uuid) -> AppResult<bool> {
    let added = state
        .repo
        .update_account(caller.account_id, |account| {
            let added = account.favorite_profile_ids.insert(profile_id);
            if !added {
                account.favorite_profile_ids.remove(&profile_id);
            }
            Ok(added)
        })
        .await?;

    let text = if added { "⭐ Added to favorites" } else { "🗑 Removed from favorites" };
    toast(state, caller, text, false).await?;
    Ok(added)
}

pub async fn remove_favorite(state: &AppState, caller: &Caller, profile_id: Uuid) -> AppResult<()> {
    let removed = state
        .repo
        .update_account(caller.account_id, |account| Ok(account.favorite_profile_ids.remove(&profile_id)))
        .await?;
    if removed {
        tracing::debug!(account_id = caller.account_id, profile_id = %profile_id, "favorite removed");
    }
    favorites(state, caller).await
}

/// Lists favorites that are still in the pool.
pub async fn favorites(state: &AppState, caller: &Caller) -> AppResult<()> {
    let account = state.repo.ensure_account(caller.account_id).await?;
    let pool = state.repo.pool().await?;
    let favs: Vec<_> = pool
        .profiles
        .iter()
        .filter(|p| account.favorite_profile_ids.contains(&p.id))
        .collect();

    if favs.is_empty() {
        return toast(state, caller, "📭 Your favorites list is empty.", true).await;
    }

    let mut text = String::from("⭐ Your favorites:\n\n");
    let mut keyboard = Keyboard::new();
    for (i, p) in favs.iter().enumerate() {
        let badge = if p.verified { "☑️ " } else { "" };
        let preview: String = p.bio.chars().take(20).collect();
        text.push_str(&format!("{}. {badge}{preview}…\n", i + 1));
        keyboard = keyboard.row(vec![
            Button::new(format!("View {}", i + 1), format!("view_profile:{}", p.id)),
            Button::new("Remove", format!("delete_favorite:{}", p.id)),
        ]);
    }
    keyboard = keyboard.button("🔙 Back", "start");
    show_text(state, caller, &text, Some(keyboard)).await
}
