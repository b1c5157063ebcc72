//! In-chat admin panel: statistics, account moderation, force-subscription
//! channels and API tokens for the HTTP admin surface.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use tryst_shared::types::auth::{issue_token, Claims, Role};
use uuid::Uuid;

use super::compose::{self, ComposeCursor};
use super::{show_text, Caller};
use crate::models::{AccountId, Gender};
use crate::repository::Repository;
use crate::security::suspicious_profiles;
use crate::transport::{Button, Keyboard};
use crate::AppState;

const ACTIVE_WINDOW_DAYS: i64 = 7;

/// Admin commands that need one more line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminOp {
    Ban,
    Unban,
    Verify,
    Info,
    DeleteProfile,
    AddChannel,
}

impl AdminOp {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "ban" => AdminOp::Ban,
            "unban" => AdminOp::Unban,
            "verify" => AdminOp::Verify,
            "info" => AdminOp::Info,
            "delete_profile" => AdminOp::DeleteProfile,
            "add_channel" => AdminOp::AddChannel,
            _ => return None,
        })
    }

    fn prompt(&self) -> &'static str {
        match self {
            AdminOp::AddChannel => "📢 Send the channel username (e.g. @tryst_news):",
            _ => "🔢 Send the account id:",
        }
    }
}

// --- Statistics ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenderDistribution {
    pub male: usize,
    pub female: usize,
    pub other: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total_accounts: usize,
    pub banned_accounts: usize,
    pub total_profiles: usize,
    pub active_last_7_days: usize,
    pub pending_submissions: usize,
    pub gender_distribution: GenderDistribution,
    /// Fresh profiles with a near-empty bio.
    pub suspicious_profile_ids: Vec<Uuid>,
}

pub async fn collect_stats(repo: &Repository, now: DateTime<Utc>) -> AppResult<Stats> {
    let pool = repo.pool().await?;
    let account_ids = repo.list_account_ids().await?;

    let mut banned_accounts = 0;
    for id in &account_ids {
        if repo.is_banned(*id).await? {
            banned_accounts += 1;
        }
    }

    let mut genders = GenderDistribution::default();
    for profile in &pool.profiles {
        match profile.gender {
            Gender::Male => genders.male += 1,
            Gender::Female => genders.female += 1,
            Gender::Other => genders.other += 1,
        }
    }

    let cutoff = now - Duration::days(ACTIVE_WINDOW_DAYS);
    Ok(Stats {
        total_accounts: account_ids.len(),
        banned_accounts,
        total_profiles: pool.profiles.len(),
        active_last_7_days: pool.profiles.iter().filter(|p| p.last_active_at >= cutoff).count(),
        pending_submissions: pool.pending.len(),
        gender_distribution: genders,
        suspicious_profile_ids: suspicious_profiles(&pool.profiles, now).iter().map(|p| p.id).collect(),
    })
}

fn render_stats(stats: &Stats) -> String {
    let g = &stats.gender_distribution;
    format!(
        "📊 Statistics\n\n👥 Accounts: {}\n⛔ Banned: {}\n👤 Profiles: {}\n🟢 Active (7 days): {}\n⏳ Pending review: {}\n\n⚧ Male: {} | Female: {} | Other: {}\n⚠️ Suspicious new profiles: {}",
        stats.total_accounts,
        stats.banned_accounts,
        stats.total_profiles,
        stats.active_last_7_days,
        stats.pending_submissions,
        g.male,
        g.female,
        g.other,
        stats.suspicious_profile_ids.len(),
    )
}

// --- Panel ---

fn require_admin(state: &AppState, caller: &Caller) -> AppResult<()> {
    if state.config.is_admin(caller.account_id) {
        return Ok(());
    }
    tracing::warn!(account_id = caller.account_id, "admin command by non-admin");
    Err(AppError::forbidden("⛔ Admins only."))
}

fn panel_keyboard() -> Keyboard {
    Keyboard::new()
        .button("📊 Statistics", "admin:stats")
        .row(vec![Button::new("⛔ Ban", "admin:ban"), Button::new("✅ Unban", "admin:unban")])
        .row(vec![Button::new("☑️ Verify", "admin:verify"), Button::new("ℹ️ User info", "admin:info")])
        .button("🗑 Delete profile", "admin:delete_profile")
        .row(vec![
            Button::new("📢 Channels", "admin:channels"),
            Button::new("➕ Add channel", "admin:add_channel"),
        ])
        .button("🏠 Main menu", "start")
}

fn back_keyboard() -> Keyboard {
    Keyboard::new().button("🔙 Admin panel", "admin:back")
}

/// `/admin`
pub async fn panel(state: &AppState, caller: &Caller) -> AppResult<()> {
    require_admin(state, caller)?;
    show_text(state, caller, "🛠 Admin panel", Some(panel_keyboard())).await
}

/// `admin:{payload}` buttons.
pub async fn handle_action(state: &AppState, caller: &Caller, payload: &str) -> AppResult<()> {
    require_admin(state, caller)?;

    if let Some(op) = AdminOp::from_tag(payload) {
        compose::open(state, caller.account_id, ComposeCursor::Admin { op }).await?;
        return show_text(state, caller, op.prompt(), Some(back_keyboard())).await;
    }
    if let Some(channel) = payload.strip_prefix("del_channel:") {
        if state.repo.remove_force_channel(channel).await? {
            tracing::info!(admin_id = caller.account_id, channel, "force channel removed");
        }
        return channels(state, caller).await;
    }

    match payload {
        "stats" => {
            let stats = collect_stats(&state.repo, Utc::now()).await?;
            show_text(state, caller, &render_stats(&stats), Some(back_keyboard())).await
        }
        "channels" => channels(state, caller).await,
        "back" | "" => {
            compose::take(state, caller.account_id).await?;
            panel(state, caller).await
        }
        other => Err(AppError::bad_request(format!("unknown admin action: {other}"))),
    }
}

async fn channels(state: &AppState, caller: &Caller) -> AppResult<()> {
    let list = state.repo.force_channels().await?;
    if list.is_empty() {
        return show_text(state, caller, "📢 No channels configured.", Some(back_keyboard())).await;
    }

    let mut keyboard = Keyboard::new();
    for channel in &list {
        keyboard = keyboard.row(vec![Button::new(format!("❌ {channel}"), format!("admin:del_channel:{channel}"))]);
    }
    keyboard = keyboard.button("🔙 Admin panel", "admin:back");
    show_text(state, caller, "📢 Channels (tap to remove):", Some(keyboard)).await
}

fn parse_account(input: &str) -> AppResult<AccountId> {
    input
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("❌ Send a numeric account id."))
}

/// Completes an admin command with the text the admin sent.
pub async fn apply(state: &AppState, caller: &Caller, op: AdminOp, input: &str) -> AppResult<()> {
    require_admin(state, caller)?;

    let reply = match op {
        AdminOp::AddChannel => {
            let channel = input.trim();
            if channel.is_empty() || channel.contains(char::is_whitespace) {
                return Err(AppError::bad_request("❌ Send a single channel username."));
            }
            if state.repo.add_force_channel(channel).await? {
                format!("✅ Channel {channel} added")
            } else {
                format!("ℹ️ {channel} is already listed")
            }
        }
        AdminOp::Ban | AdminOp::Unban => {
            let target = parse_account(input)?;
            let banned = op == AdminOp::Ban;
            state
                .repo
                .update_account(target, |a| {
                    a.banned = banned;
                    Ok(())
                })
                .await?;
            if banned {
                format!("⛔ User {target} banned")
            } else {
                format!("✅ User {target} unbanned")
            }
        }
        AdminOp::Verify => {
            let target = parse_account(input)?;
            state
                .repo
                .update_profile(target, |p| p.verified = true)
                .await
                .map_err(|e| {
                    if e.is(ErrorCode::ProfileNotFound) {
                        AppError::new(ErrorCode::ProfileNotFound, format!("❌ User {target} has no profile."))
                    } else {
                        e
                    }
                })?;
            format!("☑️ Profile of {target} verified")
        }
        AdminOp::Info => user_info(state, parse_account(input)?).await?,
        AdminOp::DeleteProfile => {
            let target = parse_account(input)?;
            let removed = state.repo.remove_profile_by_owner(target).await.map_err(|e| {
                if e.is(ErrorCode::ProfileNotFound) {
                    AppError::new(ErrorCode::ProfileNotFound, format!("❌ User {target} has no profile."))
                } else {
                    e
                }
            })?;
            format!("🗑 Profile {} of {target} deleted", removed.id)
        }
    };

    tracing::info!(admin_id = caller.account_id, op = ?op, input = input.trim(), "admin command applied");
    state
        .messenger
        .send_text(caller.chat_id, &reply, Some(back_keyboard()))
        .await?;
    Ok(())
}

async fn user_info(state: &AppState, target: AccountId) -> AppResult<String> {
    let account = state
        .repo
        .account(target)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, format!("❌ User {target} not found.")))?;

    let mut text = format!(
        "ℹ️ User {target}\n\n⛔ Banned: {}\n🔔 Notifications: {}\n💖 Likes given: {}\n⭐ Favorites: {}\n💬 Inbox: {} ({} unread)\n📅 Joined: {}",
        account.banned,
        account.notification_opt_in,
        account.liked_profile_ids.len(),
        account.favorite_profile_ids.len(),
        account.inbox.len(),
        account.unread_count(),
        account.created_at.format("%Y-%m-%d"),
    );
    match state.repo.profile_by_owner(target).await? {
        Some(p) => text.push_str(&format!(
            "\n\n👤 Profile {}\n{} {}, {}\n❤️ {} | ☑️ {}",
            p.id,
            p.gender.label(),
            p.age,
            p.location,
            p.likes_count,
            p.verified
        )),
        None => text.push_str("\n\n👤 No published profile"),
    }
    Ok(text)
}

/// `/token`: a short-lived bearer token for the admin HTTP API.
pub async fn issue_api_token(state: &AppState, caller: &Caller) -> AppResult<()> {
    require_admin(state, caller)?;
    let ttl = state.config.admin_token_ttl_secs;
    let token = issue_token(&Claims::new(caller.account_id, Role::Admin, ttl), &state.config.jwt_secret)?;
    tracing::info!(admin_id = caller.account_id, ttl_secs = ttl, "admin api token issued");
    state
        .messenger
        .send_text(caller.chat_id, &format!("🔑 API token, valid for {ttl}s:\n\n{token}"), None)
        .await?;
    Ok(())
}
