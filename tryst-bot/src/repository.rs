//! Typed access to the pool aggregate and per-account documents.

use chrono::Utc;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use crate::models::{Account, AccountId, Decision, PendingSubmission, PoolDocument, Profile};
use crate::store::Documents;

pub const POOL_KEY: &str = "data";
pub const ACCOUNT_PREFIX: &str = "account:";
pub const WIZARD_PREFIX: &str = "wizard:";
pub const COMPOSE_PREFIX: &str = "compose:";

pub fn account_key(id: AccountId) -> String {
    format!("{ACCOUNT_PREFIX}{id}")
}

pub fn wizard_key(id: AccountId) -> String {
    format!("{WIZARD_PREFIX}{id}")
}

pub fn compose_key(id: AccountId) -> String {
    format!("{COMPOSE_PREFIX}{id}")
}

pub fn rate_limit_key(id: AccountId, action: &str) -> String {
    format!("rate_limit:{id}:{action}")
}

fn profile_not_found() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "profile not found")
}

#[derive(Clone)]
pub struct Repository {
    docs: Documents,
}

impl Repository {
    pub fn new(docs: Documents) -> Self {
        Self { docs }
    }

    pub fn documents(&self) -> &Documents {
        &self.docs
    }

    // --- Pool ---

    pub async fn pool(&self) -> AppResult<PoolDocument> {
        Ok(self.docs.get(POOL_KEY).await?.unwrap_or_default())
    }

    async fn update_pool<R>(&self, f: impl FnOnce(&mut PoolDocument) -> AppResult<R>) -> AppResult<R> {
        self.docs.update(POOL_KEY, None, f).await
    }

    pub async fn profile_by_owner(&self, owner: AccountId) -> AppResult<Option<Profile>> {
        let pool = self.pool().await?;
        Ok(pool.profiles.into_iter().find(|p| p.owner_account_id == owner))
    }

    pub async fn profile_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let pool = self.pool().await?;
        Ok(pool.profiles.into_iter().find(|p| p.id == id))
    }

    /// Resolves a reference that is either a profile id or an owner account id.
    pub async fn find_profile(&self, reference: &str) -> AppResult<Option<Profile>> {
        let reference = reference.trim();
        if let Ok(id) = reference.parse::<Uuid>() {
            return self.profile_by_id(id).await;
        }
        match reference.parse::<AccountId>() {
            Ok(owner) => self.profile_by_owner(owner).await,
            Err(_) => Ok(None),
        }
    }

    pub async fn update_profile<R>(&self, owner: AccountId, f: impl FnOnce(&mut Profile) -> R) -> AppResult<R> {
        self.update_pool(|pool| {
            let profile = pool
                .profiles
                .iter_mut()
                .find(|p| p.owner_account_id == owner)
                .ok_or_else(profile_not_found)?;
            Ok(f(profile))
        })
        .await
    }

    pub async fn remove_profile(&self, id: Uuid) -> AppResult<Profile> {
        self.update_pool(|pool| {
            let idx = pool.profiles.iter().position(|p| p.id == id).ok_or_else(profile_not_found)?;
            Ok(pool.profiles.remove(idx))
        })
        .await
    }

    pub async fn remove_profile_by_owner(&self, owner: AccountId) -> AppResult<Profile> {
        self.update_pool(|pool| {
            let idx = pool
                .profiles
                .iter()
                .position(|p| p.owner_account_id == owner)
                .ok_or_else(profile_not_found)?;
            Ok(pool.profiles.remove(idx))
        })
        .await
    }

    /// Returns the updated profile, or `None` if it vanished in the meantime.
    pub async fn increment_likes(&self, profile_id: Uuid) -> AppResult<Option<Profile>> {
        self.update_pool(|pool| {
            Ok(pool.profiles.iter_mut().find(|p| p.id == profile_id).map(|p| {
                p.likes_count += 1;
                p.clone()
            }))
        })
        .await
    }

    // --- Moderation queue ---

    pub async fn has_pending(&self, owner: AccountId) -> AppResult<bool> {
        let pool = self.pool().await?;
        Ok(pool.pending.iter().any(|s| s.owner() == owner))
    }

    /// Appends to the queue unless the owner already has a submission waiting.
    pub async fn enqueue_submission(&self, submission: PendingSubmission) -> AppResult<()> {
        self.update_pool(|pool| {
            if pool.pending.iter().any(|s| s.owner() == submission.owner()) {
                return Err(AppError::new(
                    ErrorCode::SubmissionAlreadyPending,
                    "a submission is already waiting for review",
                ));
            }
            pool.pending.push(submission);
            Ok(())
        })
        .await
    }

    pub async fn pending(&self, id: Uuid) -> AppResult<Option<PendingSubmission>> {
        let pool = self.pool().await?;
        Ok(pool.pending.into_iter().find(|s| s.id() == id))
    }

    pub async fn list_pending(&self) -> AppResult<Vec<PendingSubmission>> {
        Ok(self.pool().await?.pending)
    }

    /// Removes the submission from the queue and, on approval, swaps it in
    /// for the owner's current profile. One transform, so a submission is
    /// resolved at most once.
    ///
    /// An approved edit keeps the replaced profile's id, counters and
    /// creation time, so likes and favorites pointing at it stay valid.
    pub async fn resolve_submission(&self, id: Uuid, decision: Decision) -> AppResult<PendingSubmission> {
        self.update_pool(|pool| {
            let idx = pool.pending.iter().position(|s| s.id() == id).ok_or_else(|| {
                AppError::new(ErrorCode::PendingSubmissionNotFound, "submission not found or already handled")
            })?;
            let submission = pool.pending.remove(idx);

            if decision == Decision::Approve {
                let owner = submission.owner();
                let mut profile = submission.profile.clone();
                if let Some(old) = pool.profiles.iter().find(|p| p.owner_account_id == owner) {
                    profile.id = old.id;
                    profile.likes_count = old.likes_count;
                    profile.dislikes_count = old.dislikes_count;
                    profile.created_at = old.created_at;
                }
                pool.profiles.retain(|p| p.owner_account_id != owner);
                profile.last_active_at = Utc::now();
                pool.profiles.push(profile);
            }
            Ok(submission)
        })
        .await
    }

    // --- Force-subscription channels ---

    pub async fn force_channels(&self) -> AppResult<Vec<String>> {
        Ok(self.pool().await?.force_channels)
    }

    /// Returns false when the channel was already listed.
    pub async fn add_force_channel(&self, channel: &str) -> AppResult<bool> {
        let channel = channel.trim().to_string();
        self.update_pool(|pool| {
            if pool.force_channels.contains(&channel) {
                return Ok(false);
            }
            pool.force_channels.push(channel);
            Ok(true)
        })
        .await
    }

    pub async fn remove_force_channel(&self, channel: &str) -> AppResult<bool> {
        let channel = channel.trim();
        self.update_pool(|pool| {
            let before = pool.force_channels.len();
            pool.force_channels.retain(|c| c != channel);
            Ok(pool.force_channels.len() != before)
        })
        .await
    }

    // --- Accounts ---

    /// Creates the account on first contact; never overwrites an existing one.
    pub async fn ensure_account(&self, id: AccountId) -> AppResult<Account> {
        self.docs
            .modify(&account_key(id), None, |current: Option<Account>| {
                let account = current.unwrap_or_else(|| {
                    tracing::info!(account_id = id, "account created");
                    Account::new(id, Utc::now())
                });
                Ok((Some(account.clone()), account))
            })
            .await
    }

    pub async fn account(&self, id: AccountId) -> AppResult<Option<Account>> {
        self.docs.get(&account_key(id)).await
    }

    /// Mutates an existing account; `AccountNotFound` otherwise.
    pub async fn update_account<R>(
        &self,
        id: AccountId,
        f: impl FnOnce(&mut Account) -> AppResult<R>,
    ) -> AppResult<R> {
        self.docs
            .modify(&account_key(id), None, |current: Option<Account>| {
                let mut account = current
                    .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound, "account not found"))?;
                let out = f(&mut account)?;
                Ok((Some(account), out))
            })
            .await
    }

    pub async fn list_account_ids(&self) -> AppResult<Vec<AccountId>> {
        let keys = self.docs.list_keys(ACCOUNT_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|k| k.strip_prefix(ACCOUNT_PREFIX)?.parse().ok())
            .collect())
    }

    pub async fn is_banned(&self, id: AccountId) -> AppResult<bool> {
        Ok(self.account(id).await?.map_or(false, |a| a.banned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn repo() -> Repository {
        Repository::new(Documents::new(Arc::new(MemoryStore::new())))
    }

    #[tokio::test]
    async fn enqueue_refuses_second_submission_for_owner() {
        let repo = repo();
        repo.enqueue_submission(fixtures::submission(1)).await.unwrap();
        let err = repo.enqueue_submission(fixtures::submission(1)).await.unwrap_err();
        assert!(err.is(ErrorCode::SubmissionAlreadyPending));
        repo.enqueue_submission(fixtures::submission(2)).await.unwrap();
        assert_eq!(repo.list_pending().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn approval_replaces_existing_profile() {
        let repo = repo();
        let first = fixtures::submission(1);
        repo.enqueue_submission(first.clone()).await.unwrap();
        repo.resolve_submission(first.id(), Decision::Approve).await.unwrap();

        repo.increment_likes(first.id()).await.unwrap();

        let mut second = fixtures::submission(1);
        second.profile.location = "UAE - Dubai".into();
        repo.enqueue_submission(second.clone()).await.unwrap();
        repo.resolve_submission(second.id(), Decision::Approve).await.unwrap();

        let pool = repo.pool().await.unwrap();
        assert_eq!(pool.profiles.len(), 1);
        // The edit takes the published profile's id, not its own submission id.
        assert_eq!(pool.profiles[0].id, first.id());
        assert_ne!(pool.profiles[0].id, second.id());
        assert_eq!(pool.profiles[0].location, second.profile.location);
        assert_eq!(pool.profiles[0].likes_count, 1);
        assert!(pool.pending.is_empty());
    }

    #[tokio::test]
    async fn decline_only_removes_from_queue() {
        let repo = repo();
        let sub = fixtures::submission(3);
        repo.enqueue_submission(sub.clone()).await.unwrap();
        repo.resolve_submission(sub.id(), Decision::Decline).await.unwrap();

        let pool = repo.pool().await.unwrap();
        assert!(pool.profiles.is_empty());
        assert!(pool.pending.is_empty());

        let err = repo.resolve_submission(sub.id(), Decision::Decline).await.unwrap_err();
        assert!(err.is(ErrorCode::PendingSubmissionNotFound));
    }

    #[tokio::test]
    async fn concurrent_resolution_happens_once() {
        let repo = repo();
        let sub = fixtures::submission(4);
        repo.enqueue_submission(sub.clone()).await.unwrap();
        let id = sub.id();

        let a = tokio::spawn({
            let repo = repo.clone();
            async move { repo.resolve_submission(id, Decision::Approve).await }
        });
        let b = tokio::spawn({
            let repo = repo.clone();
            async move { repo.resolve_submission(id, Decision::Decline).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }

    #[tokio::test]
    async fn find_profile_by_id_or_owner() {
        let repo = repo();
        let sub = fixtures::submission(77);
        repo.enqueue_submission(sub.clone()).await.unwrap();
        repo.resolve_submission(sub.id(), Decision::Approve).await.unwrap();

        let by_id = repo.find_profile(&sub.id().to_string()).await.unwrap().unwrap();
        let by_owner = repo.find_profile("77").await.unwrap().unwrap();
        assert_eq!(by_id.id, by_owner.id);
        assert!(repo.find_profile("nonsense").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_account_is_idempotent() {
        let repo = repo();
        repo.ensure_account(9).await.unwrap();
        repo.update_account(9, |a| {
            a.banned = true;
            Ok(())
        })
        .await
        .unwrap();
        let again = repo.ensure_account(9).await.unwrap();
        assert!(again.banned);
        assert_eq!(repo.list_account_ids().await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn update_missing_account_fails() {
        let err = repo().update_account(5, |_| Ok(())).await.unwrap_err();
        assert!(err.is(ErrorCode::AccountNotFound));
    }

    #[tokio::test]
    async fn force_channels_are_a_set() {
        let repo = repo();
        assert!(repo.add_force_channel("@news").await.unwrap());
        assert!(!repo.add_force_channel("@news").await.unwrap());
        assert!(repo.remove_force_channel("@news").await.unwrap());
        assert!(repo.force_channels().await.unwrap().is_empty());
    }
}
