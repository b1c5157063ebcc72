use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use tryst_shared::errors::{AppError, AppResult};
use tryst_shared::middleware::AdminUser;
use tryst_shared::types::api::ApiResponse;
use tryst_shared::types::pagination::{Paginated, PaginationParams};
use uuid::Uuid;

use crate::handlers::admin::{collect_stats, Stats};
use crate::models::PendingSubmission;
use crate::AppState;

/// The token role says admin; the live admin list has the final word.
fn check_admin(state: &AppState, admin: &AdminUser) -> AppResult<i64> {
    let account = admin.0.account_id;
    if !state.config.is_admin(account) {
        tracing::warn!(account_id = account, "admin token for an account no longer in the admin list");
        return Err(AppError::forbidden("admin access required"));
    }
    Ok(account)
}

// --- Moderation queue ---

/// GET /admin/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<PendingSubmission>>>> {
    check_admin(&state, &admin)?;
    let pending = state.repo.list_pending().await?;
    Ok(Json(ApiResponse::ok(Paginated::from_slice(&pending, &params))))
}

/// POST /admin/pending/:id/approve
pub async fn approve(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PendingSubmission>>> {
    let account = check_admin(&state, &admin)?;
    let submission = state.moderator.approve(account, id, None).await?;
    Ok(Json(ApiResponse::ok_with_message(submission, "submission approved")))
}

/// POST /admin/pending/:id/decline
pub async fn decline(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PendingSubmission>>> {
    let account = check_admin(&state, &admin)?;
    let submission = state.moderator.decline(account, id, None).await?;
    Ok(Json(ApiResponse::ok_with_message(submission, "submission declined")))
}

// --- Statistics ---

/// GET /admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
) -> AppResult<Json<ApiResponse<Stats>>> {
    check_admin(&state, &admin)?;
    let stats = collect_stats(&state.repo, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(stats)))
}
