use tryst_shared::errors::{AppError, AppResult, ErrorCode};

use super::{show_text, toast, Caller};
use crate::models::TargetGender;
use crate::transport::{Button, Keyboard};
use crate::AppState;

fn no_profile() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "📝 Create your profile first.")
}

fn friendly(e: AppError) -> AppError {
    if e.is(ErrorCode::ProfileNotFound) { no_profile() } else { e }
}

fn flag(on: bool) -> &'static str {
    if on { "✅" } else { "❌" }
}

pub async fn show(state: &AppState, caller: &Caller) -> AppResult<()> {
    let profile = state.repo.profile_by_owner(caller.account_id).await?.ok_or_else(no_profile)?;
    let account = state.repo.ensure_account(caller.account_id).await?;

    let keyboard = Keyboard::new()
        .button(
            format!("🔔 Notifications: {}", flag(account.notification_opt_in)),
            "toggle_setting:notifications",
        )
        .button(format!("👀 Show age: {}", flag(profile.show_age)), "toggle_setting:show_age")
        .button(
            format!("📍 Show location: {}", flag(profile.show_location)),
            "toggle_setting:show_location",
        )
        .button(
            format!("🎯 Looking for: {}", profile.target_gender.label()),
            "set_target_gender",
        )
        .button("🔙 Back", "start");
    show_text(state, caller, "⚙️ Settings\n\nTune your experience:", Some(keyboard)).await
}

/// `toggle_setting:{name}` flips one boolean and redraws the screen.
pub async fn toggle(state: &AppState, caller: &Caller, name: &str) -> AppResult<()> {
    let owner = caller.account_id;
    match name {
        "notifications" => {
            state
                .repo
                .update_account(owner, |a| {
                    a.notification_opt_in = !a.notification_opt_in;
                    Ok(())
                })
                .await?
        }
        "show_age" => state
            .repo
            .update_profile(owner, |p| p.show_age = !p.show_age)
            .await
            .map_err(friendly)?,
        "show_location" => state
            .repo
            .update_profile(owner, |p| p.show_location = !p.show_location)
            .await
            .map_err(friendly)?,
        other => return Err(AppError::bad_request(format!("unknown setting: {other}"))),
    }
    tracing::debug!(account_id = owner, setting = name, "setting toggled");
    show(state, caller).await
}

/// Without a payload offers the choices; with one, stores it.
pub async fn set_target_gender(state: &AppState, caller: &Caller, payload: &str) -> AppResult<()> {
    if payload.is_empty() {
        let choices = TargetGender::ALL
            .iter()
            .map(|t| Button::new(t.label(), format!("set_target_gender:{}", t.as_str())))
            .collect();
        let keyboard = Keyboard::new().row(choices).button("🔙 Back", "settings");
        return show_text(state, caller, "🎯 Who are you looking for?", Some(keyboard)).await;
    }

    let target: TargetGender = payload.parse().map_err(|e: String| AppError::bad_request(e))?;
    state
        .repo
        .update_profile(caller.account_id, |p| p.target_gender = target)
        .await
        .map_err(friendly)?;
    toast(state, caller, "✅ Preferences saved!", false).await?;
    show(state, caller).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures, Decision};
    use crate::testing;

    fn caller(account: i64) -> Caller {
        Caller { account_id: account, chat_id: account, action: None, message: None, name: None }
    }

    async fn with_profile(state: &AppState, owner: i64) {
        let sub = fixtures::submission(owner);
        state.repo.enqueue_submission(sub.clone()).await.unwrap();
        state.repo.resolve_submission(sub.id(), Decision::Approve).await.unwrap();
        state.repo.ensure_account(owner).await.unwrap();
    }

    #[tokio::test]
    async fn toggles_flip_the_right_record() {
        let (state, _) = testing::state();
        with_profile(&state, 1).await;

        toggle(&state, &caller(1), "show_age").await.unwrap();
        toggle(&state, &caller(1), "notifications").await.unwrap();

        let profile = state.repo.profile_by_owner(1).await.unwrap().unwrap();
        assert!(!profile.show_age);
        assert!(profile.show_location);
        assert!(!state.repo.account(1).await.unwrap().unwrap().notification_opt_in);

        toggle(&state, &caller(1), "show_age").await.unwrap();
        assert!(state.repo.profile_by_owner(1).await.unwrap().unwrap().show_age);
    }

    #[tokio::test]
    async fn unknown_setting_is_rejected() {
        let (state, _) = testing::state();
        with_profile(&state, 1).await;
        let err = toggle(&state, &caller(1), "dark_mode").await.unwrap_err();
        assert!(err.is(ErrorCode::BadRequest));
    }

    #[tokio::test]
    async fn target_gender_is_saved() {
        let (state, messenger) = testing::state();
        with_profile(&state, 1).await;

        set_target_gender(&state, &caller(1), "").await.unwrap();
        let offered = messenger.last_to(1).unwrap();
        assert_eq!(offered.keyboard().unwrap().buttons().count(), TargetGender::ALL.len() + 1);

        set_target_gender(&state, &caller(1), "female").await.unwrap();
        let profile = state.repo.profile_by_owner(1).await.unwrap().unwrap();
        assert_eq!(profile.target_gender, TargetGender::Female);
    }

    #[tokio::test]
    async fn settings_need_a_profile() {
        let (state, _) = testing::state();
        state.repo.ensure_account(1).await.unwrap();
        assert!(show(&state, &caller(1)).await.unwrap_err().is(ErrorCode::ProfileNotFound));
    }
}
