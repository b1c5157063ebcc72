use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use super::start::home;
use super::{toast, Caller};
use crate::AppState;

/// `delete_profile:{id}`: the owner or an admin removes a published profile.
pub async fn delete_profile(state: &AppState, caller: &Caller, profile_id: Uuid) -> AppResult<()> {
    let profile = state
        .repo
        .profile_by_id(profile_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "❌ This profile no longer exists."))?;

    let is_owner = profile.owner_account_id == caller.account_id;
    if !is_owner && !state.config.is_admin(caller.account_id) {
        tracing::warn!(account_id = caller.account_id, profile_id = %profile_id, "profile deletion refused");
        return Err(AppError::forbidden("⛔ You can only delete your own profile."));
    }

    state.repo.remove_profile(profile_id).await?;
    tracing::info!(
        account_id = caller.account_id,
        owner_id = profile.owner_account_id,
        profile_id = %profile_id,
        "profile deleted"
    );

    toast(state, caller, "✅ Profile deleted", false).await?;
    home(state, caller).await
}
