//! Browsing the pool: paged exploration, single profiles and the best match.

use chrono::Utc;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};

use super::{show_photo, toast, Caller};
use crate::matching::rank;
use crate::models::Profile;
use crate::rate_limit::LimitedAction;
use crate::transport::{Button, Keyboard};
use crate::AppState;

/// Profile card text with the owner's privacy choices applied.
pub fn card(profile: &Profile, title: &str) -> String {
    let badge = if profile.verified { " ☑️" } else { "" };
    let age = if profile.show_age { profile.age.to_string() } else { "🔒".into() };
    let location = if profile.show_location { profile.location.as_str() } else { "🔒" };
    format!(
        "{title}{badge}\n\n🎂 Age: {age}\n⚧ Gender: {}\n📍 Location: {location}\n🎨 Interests: {}\n\n📝 Bio:\n{}\n\n❤️ {} | 👎 {}",
        profile.gender.label(),
        profile.interests,
        profile.bio,
        profile.likes_count,
        profile.dislikes_count,
    )
}

fn actions_row(profile: &Profile) -> Vec<Button> {
    vec![
        Button::new("💖 Like", format!("react:like:{}", profile.id)),
        Button::new("💌 Message", format!("message:{}", profile.owner_account_id)),
        Button::new("⭐ Save", format!("favorite:{}", profile.id)),
    ]
}

/// Maps any page number onto `0..len`, wrapping at both ends.
fn wrap_page(page: i64, len: usize) -> usize {
    let len = len as i64;
    if page >= len {
        0
    } else if page < 0 {
        (len - 1) as usize
    } else {
        page as usize
    }
}

/// Shows one profile of the gender-filtered pool.
pub async fn explore(state: &AppState, caller: &Caller, page: i64) -> AppResult<()> {
    let pool = state.repo.pool().await?;
    let requester = pool.profiles.iter().find(|p| p.owner_account_id == caller.account_id);
    let visible: Vec<&Profile> = match requester {
        Some(me) => pool.profiles.iter().filter(|p| me.target_gender.accepts(p.gender)).collect(),
        None => pool.profiles.iter().collect(),
    };

    if visible.is_empty() {
        return toast(state, caller, "📭 No profiles match your search yet.", true).await;
    }
    state.limiter.hit(caller.account_id, LimitedAction::ProfileView).await?;

    let page = wrap_page(page, visible.len());
    let profile = visible[page];

    let mut keyboard = Keyboard::new();
    if visible.len() > 1 {
        let (prev, next) = (page as i64 - 1, page as i64 + 1);
        keyboard = keyboard.row(vec![
            Button::new("⬅️", format!("explore:{prev}")),
            Button::new(format!("{}/{}", page + 1, visible.len()), "noop"),
            Button::new("➡️", format!("explore:{next}")),
        ]);
    }
    keyboard = keyboard.row(actions_row(profile));
    if profile.owner_account_id == caller.account_id {
        keyboard = keyboard.button("🗑 Delete my profile", format!("delete_profile:{}", profile.id));
    }
    keyboard = keyboard.button("🏠 Main menu", "start");

    show_photo(state, caller, &profile.photo_reference, &card(profile, "👤 Profile"), Some(keyboard)).await
}

/// `view_profile:{reference}` where the reference is a profile id or an
/// owner account id.
pub async fn view_profile(state: &AppState, caller: &Caller, reference: &str) -> AppResult<()> {
    let profile = state
        .repo
        .find_profile(reference)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "❌ This profile no longer exists."))?;
    state.limiter.hit(caller.account_id, LimitedAction::ProfileView).await?;

    let keyboard = Keyboard::new()
        .row(actions_row(&profile))
        .button("🔙 Back", "start");
    show_photo(state, caller, &profile.photo_reference, &card(&profile, "👤 Profile"), Some(keyboard)).await
}

/// Shows the highest ranked candidate for the caller's profile.
pub async fn matches(state: &AppState, caller: &Caller) -> AppResult<()> {
    let pool = state.repo.pool().await?;
    let me = pool
        .profiles
        .iter()
        .find(|p| p.owner_account_id == caller.account_id)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "📝 Create your profile first to get matches."))?;

    let ranked = rank(me, &pool.profiles, Utc::now());
    let Some(best) = ranked.first() else {
        return toast(state, caller, "💤 No matches right now. Try again later!", true).await;
    };
    tracing::debug!(account_id = caller.account_id, candidates = ranked.len(), top_score = best.score, "matches ranked");

    let title = format!("✨ Your best match ({}%)", best.score);
    let keyboard = Keyboard::new()
        .row(actions_row(&best.profile))
        .button("🔙 Back", "start");
    show_photo(state, caller, &best.profile.photo_reference, &card(&best.profile, &title), Some(keyboard)).await
}
