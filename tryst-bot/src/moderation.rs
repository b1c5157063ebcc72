//! Admin decisions on queued profile submissions.

use std::sync::Arc;

use metrics::counter;
use tryst_shared::errors::{AppError, AppResult};
use uuid::Uuid;

use crate::models::{AccountId, Decision, PendingSubmission};
use crate::notify::best_effort;
use crate::repository::Repository;
use crate::transport::{MessageRef, Messenger};
use crate::wizard::prompts::review_caption;

pub const APPROVED_NOTICE: &str = "🎉 Your profile was approved! Others can now find you.";
pub const DECLINED_NOTICE: &str = "❌ Your profile was declined. You can edit it and submit again.";

#[derive(Clone)]
pub struct Moderator {
    repo: Repository,
    messenger: Arc<dyn Messenger>,
    admin_ids: Arc<Vec<AccountId>>,
}

impl Moderator {
    pub fn new(repo: Repository, messenger: Arc<dyn Messenger>, admin_ids: Vec<AccountId>) -> Self {
        Self {
            repo,
            messenger,
            admin_ids: Arc::new(admin_ids),
        }
    }

    pub fn is_admin(&self, account: AccountId) -> bool {
        self.admin_ids.contains(&account)
    }

    pub async fn approve(&self, admin: AccountId, id: Uuid, review: Option<MessageRef>) -> AppResult<PendingSubmission> {
        self.decide(admin, id, Decision::Approve, review).await
    }

    pub async fn decline(&self, admin: AccountId, id: Uuid, review: Option<MessageRef>) -> AppResult<PendingSubmission> {
        self.decide(admin, id, Decision::Decline, review).await
    }

    /// Resolves the submission exactly once. `review` is the admin's copy of
    /// the review request, edited to record the outcome.
    pub async fn decide(
        &self,
        admin: AccountId,
        id: Uuid,
        decision: Decision,
        review: Option<MessageRef>,
    ) -> AppResult<PendingSubmission> {
        if !self.is_admin(admin) {
            tracing::warn!(account_id = admin, submission_id = %id, "moderation attempt by non-admin");
            return Err(AppError::forbidden("only admins can review profiles"));
        }

        let submission = self.repo.resolve_submission(id, decision).await?;
        let owner = submission.owner();

        let notice = match decision {
            Decision::Approve => APPROVED_NOTICE,
            Decision::Decline => DECLINED_NOTICE,
        };
        best_effort("moderation result", owner, self.messenger.send_text(owner, notice, None)).await;

        if let Some(review) = review {
            let outcome = match decision {
                Decision::Approve => "✅ Approved",
                Decision::Decline => "❌ Declined",
            };
            let text = format!("{}\n\n{outcome} by {admin}", review_caption(&submission));
            best_effort("review update", admin, self.messenger.edit_message(&review, &text, None)).await;
        }

        counter!("moderation_decisions_total", "decision" => decision.as_str()).increment(1);
        tracing::info!(
            admin_id = admin,
            owner_id = owner,
            submission_id = %id,
            decision = decision.as_str(),
            "submission resolved"
        );
        Ok(submission)
    }
}
