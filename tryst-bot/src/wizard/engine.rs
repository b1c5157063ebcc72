use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::counter;
use tokio::task::AbortHandle;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;
use validator::Validate;

use super::prompts;
use super::state::{advance, CompletedDraft, StepOutcome, WizardSession};
use crate::models::{AccountId, PendingSubmission, Profile, DEFAULT_TARGET_AGE_RANGE};
use crate::notify::best_effort;
use crate::repository::{wizard_key, Repository, WIZARD_PREFIX};
use crate::transport::{InboundEvent, Messenger};

/// Drives onboarding sessions. Cheap to clone; clones share timers.
#[derive(Clone)]
pub struct WizardEngine {
    repo: Repository,
    messenger: Arc<dyn Messenger>,
    admin_ids: Arc<Vec<AccountId>>,
    timeout: Duration,
    timers: Arc<DashMap<AccountId, (Uuid, AbortHandle)>>,
}

impl WizardEngine {
    pub fn new(
        repo: Repository,
        messenger: Arc<dyn Messenger>,
        admin_ids: Vec<AccountId>,
        timeout: Duration,
    ) -> Self {
        Self {
            repo,
            messenger,
            admin_ids: Arc::new(admin_ids),
            timeout,
            timers: Arc::new(DashMap::new()),
        }
    }

    /// Opens a session, replacing any session the account already had.
    pub async fn start(&self, account: AccountId, chat_id: i64) -> AppResult<()> {
        if self.repo.has_pending(account).await? {
            return Err(AppError::new(ErrorCode::SubmissionAlreadyPending, prompts::ALREADY_PENDING));
        }
        let editing = self.repo.profile_by_owner(account).await?.is_some();
        let session = WizardSession::new(account, chat_id, editing, self.deadline());
        let wait_id = session.wait_id;

        self.repo
            .documents()
            .modify(&wizard_key(account), None, |_: Option<WizardSession>| {
                self.arm(account, wait_id, self.timeout);
                Ok((Some(session), ()))
            })
            .await?;

        let intro = if editing {
            format!("{}\n\n{}", prompts::EDITING_NOTICE, prompts::PHOTO)
        } else {
            prompts::PHOTO.to_string()
        };
        self.messenger.send_text(chat_id, &intro, None).await?;

        counter!("wizard_sessions_total", "outcome" => "started").increment(1);
        tracing::info!(account_id = account, editing, "wizard started");
        Ok(())
    }

    /// Offers `event` to the account's session. Returns false when no
    /// session waits for it, so the caller can route it elsewhere.
    pub async fn handle(&self, event: &InboundEvent) -> AppResult<bool> {
        let account = event.account_id();
        let key = wizard_key(account);

        let Some(current) = self.repo.documents().get::<WizardSession>(&key).await? else {
            return Ok(false);
        };
        if !current.predicate().matches(event) {
            return Ok(false);
        }

        let deadline = self.deadline();
        let transition = self
            .repo
            .documents()
            .modify(&key, None, |cur: Option<WizardSession>| {
                let Some(mut session) = cur else {
                    return Ok((None, None));
                };
                let outcome = advance(&mut session, event);
                // Timers change under the key lock so they follow write order.
                let next = match outcome {
                    StepOutcome::Ignored => Some(session.clone()),
                    StepOutcome::Reprompt(_) | StepOutcome::Advanced => {
                        session.rearm(deadline);
                        self.arm(account, session.wait_id, self.timeout);
                        Some(session.clone())
                    }
                    StepOutcome::Completed(_) | StepOutcome::Corrupt => {
                        self.disarm(account, session.wait_id);
                        None
                    }
                };
                Ok((next, Some((outcome, session))))
            })
            .await?;

        let Some((outcome, session)) = transition else {
            return Ok(false);
        };

        match outcome {
            StepOutcome::Ignored => Ok(false),
            StepOutcome::Reprompt(hint) => {
                match event.action_ref() {
                    Some(action) => {
                        best_effort("answer", account, self.messenger.answer_action(action, Some(hint), true)).await;
                    }
                    None => {
                        self.messenger.send_text(session.chat_id, hint, None).await?;
                    }
                }
                Ok(true)
            }
            StepOutcome::Advanced => {
                if let Some(action) = event.action_ref() {
                    best_effort("answer", account, self.messenger.answer_action(action, None, false)).await;
                }
                let (text, keyboard) = prompts::for_step(session.step, &session.draft);
                self.messenger.send_text(session.chat_id, &text, keyboard).await?;
                tracing::debug!(account_id = account, step = %session.step, "wizard advanced");
                Ok(true)
            }
            StepOutcome::Completed(done) => {
                self.commit(&session, done).await?;
                Ok(true)
            }
            StepOutcome::Corrupt => {
                counter!("wizard_sessions_total", "outcome" => "failed").increment(1);
                Err(AppError::internal(format!(
                    "wizard session for account {account} finished with missing answers"
                )))
            }
        }
    }

    /// Aborts the account's session. Returns false when there was none.
    pub async fn cancel(&self, account: AccountId) -> AppResult<bool> {
        let removed = self
            .repo
            .documents()
            .modify(&wizard_key(account), None, |cur: Option<WizardSession>| {
                if let Some(s) = &cur {
                    self.disarm(account, s.wait_id);
                }
                Ok((None, cur.is_some()))
            })
            .await?;
        if removed {
            counter!("wizard_sessions_total", "outcome" => "cancelled").increment(1);
            tracing::info!(account_id = account, "wizard cancelled");
        }
        Ok(removed)
    }

    /// Re-arms the timers of sessions persisted by a previous process.
    /// Sessions whose deadline already passed expire right away.
    pub async fn resume(&self) -> AppResult<usize> {
        let docs = self.repo.documents();
        let mut resumed = 0;
        for key in docs.list_keys(WIZARD_PREFIX).await? {
            let session = match docs.get::<WizardSession>(&key).await {
                Ok(Some(s)) => s,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(key, error = %e, "dropping unreadable wizard session");
                    docs.delete(&key).await?;
                    continue;
                }
            };
            self.arm(session.account_id, session.wait_id, remaining(session.deadline));
            resumed += 1;
        }
        if resumed > 0 {
            tracing::info!(sessions = resumed, "wizard sessions resumed");
        }
        Ok(resumed)
    }

    async fn commit(&self, session: &WizardSession, done: CompletedDraft) -> AppResult<()> {
        let account = session.account_id;
        let submission = build_submission(account, done, Utc::now());
        submission
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Err(e) = self.repo.enqueue_submission(submission.clone()).await {
            counter!("wizard_sessions_total", "outcome" => "failed").increment(1);
            return Err(e);
        }

        let caption = prompts::review_caption(&submission);
        for &admin in self.admin_ids.iter() {
            best_effort(
                "review request",
                admin,
                self.messenger.send_photo(
                    admin,
                    &submission.profile.photo_reference,
                    &caption,
                    Some(prompts::review_keyboard(&submission)),
                ),
            )
            .await;
        }

        self.messenger.send_text(session.chat_id, prompts::SUBMITTED, None).await?;

        counter!("submissions_total").increment(1);
        counter!("wizard_sessions_total", "outcome" => "completed").increment(1);
        tracing::info!(
            account_id = account,
            submission_id = %submission.id(),
            editing = session.editing,
            "profile submitted for review"
        );
        Ok(())
    }

    /// Fires only if the cursor still holds `wait_id`. A cursor that moved on
    /// without a timer of its own gets one armed for its remaining time.
    async fn expire(&self, account: AccountId, wait_id: Uuid) -> AppResult<()> {
        let expired = self
            .repo
            .documents()
            .modify(&wizard_key(account), None, |cur: Option<WizardSession>| {
                // Unregister without aborting: this runs inside the timer task.
                self.timers.remove_if(&account, |_, (id, _)| *id == wait_id);
                match cur {
                    Some(s) if s.wait_id == wait_id => Ok((None, Some(s))),
                    Some(s) => {
                        let armed = self.timers.get(&account).is_some_and(|t| t.0 == s.wait_id);
                        if !armed {
                            tracing::warn!(account_id = account, "wizard session had no timer, re-arming");
                            self.arm(account, s.wait_id, remaining(s.deadline));
                        }
                        Ok((Some(s), None))
                    }
                    None => Ok((None, None)),
                }
            })
            .await?;

        let Some(session) = expired else {
            return Ok(());
        };
        best_effort("timeout notice", account, self.messenger.send_text(session.chat_id, prompts::TIMED_OUT, None)).await;
        counter!("wizard_sessions_total", "outcome" => "timed_out").increment(1);
        tracing::info!(account_id = account, step = %session.step, "wizard timed out");
        Ok(())
    }

    fn arm(&self, account: AccountId, wait_id: Uuid, after: Duration) {
        let engine = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Err(e) = engine.expire(account, wait_id).await {
                tracing::error!(account_id = account, error = %e, "failed to expire wizard session");
            }
        });
        if let Some((_, previous)) = self.timers.insert(account, (wait_id, task.abort_handle())) {
            previous.abort();
        }
    }

    fn disarm(&self, account: AccountId, wait_id: Uuid) {
        if let Some((_, (_, handle))) = self.timers.remove_if(&account, |_, (id, _)| *id == wait_id) {
            handle.abort();
        }
    }

    fn deadline(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::zero())
    }
}

fn remaining(deadline: DateTime<Utc>) -> Duration {
    (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

fn build_submission(owner: AccountId, done: CompletedDraft, now: DateTime<Utc>) -> PendingSubmission {
    PendingSubmission {
        profile: Profile {
            id: Uuid::new_v4(),
            owner_account_id: owner,
            photo_reference: done.photo_reference,
            bio: done.bio,
            age: done.age,
            gender: done.gender,
            location: done.location,
            interests: done.interests,
            likes_count: 0,
            dislikes_count: 0,
            created_at: now,
            last_active_at: now,
            show_age: true,
            show_location: true,
            verified: false,
            target_gender: done.target_gender,
            target_age_range: DEFAULT_TARGET_AGE_RANGE,
        },
        submitted_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{fixtures, Decision};
    use crate::store::{Documents, MemoryStore};
    use crate::transport::recording::{RecordingMessenger, Sent};
    use crate::transport::ActionRef;
    use crate::wizard::state::WizardStep;

    const USER: AccountId = 1;
    const ADMINS: [AccountId; 2] = [100, 101];

    struct Fixture {
        engine: WizardEngine,
        repo: Repository,
        messenger: Arc<RecordingMessenger>,
    }

    fn fixture() -> Fixture {
        let repo = Repository::new(Documents::new(Arc::new(MemoryStore::new())));
        let messenger = Arc::new(RecordingMessenger::new());
        let engine = WizardEngine::new(repo.clone(), messenger.clone(), ADMINS.to_vec(), Duration::from_secs(60));
        Fixture { engine, repo, messenger }
    }

    fn text(account: AccountId, t: &str) -> InboundEvent {
        InboundEvent::Text { account_id: account, chat_id: account, text: t.into(), sender_name: None }
    }

    fn photo(account: AccountId) -> InboundEvent {
        InboundEvent::Photo { account_id: account, chat_id: account, file_id: "photo-abc".into() }
    }

    fn action(account: AccountId, data: &str) -> InboundEvent {
        InboundEvent::action(account, account, ActionRef(format!("cb-{data}")), None, data, None)
    }

    fn full_answers() -> Vec<InboundEvent> {
        vec![
            photo(USER),
            text(USER, "25"),
            action(USER, "gender:female"),
            action(USER, "target:male"),
            action(USER, "country:Egypt"),
            action(USER, "region:Cairo"),
            text(USER, "music travel"),
            text(USER, "this is a sufficiently long biography"),
        ]
    }

    async fn session(f: &Fixture) -> Option<WizardSession> {
        f.repo.documents().get(&wizard_key(USER)).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn completed_flow_submits_once_and_notifies_admins() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        for event in full_answers() {
            assert!(f.engine.handle(&event).await.unwrap());
        }

        let pending = f.repo.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        let sub = &pending[0];
        assert_eq!(sub.owner(), USER);
        assert_eq!(sub.profile.location, "Egypt - Cairo");
        assert_eq!(sub.profile.target_age_range, (18, 40));
        assert!(!sub.profile.verified);

        for admin in ADMINS {
            let notices = f.messenger.sent_to(admin);
            assert_eq!(notices.len(), 1);
            match &notices[0] {
                Sent::Photo { photo, keyboard, .. } => {
                    assert_eq!(photo, "photo-abc");
                    let kb = keyboard.as_ref().unwrap();
                    assert!(kb.buttons().any(|b| b.data == format!("approve:{}", sub.id())));
                }
                other => panic!("expected photo, got {other:?}"),
            }
        }
        let confirmations = f
            .messenger
            .sent_to(USER)
            .into_iter()
            .filter(|s| s.body() == prompts::SUBMITTED)
            .count();
        assert_eq!(confirmations, 1);
        assert!(session(&f).await.is_none());
        assert!(f.engine.timers.is_empty());

        // A timer from the finished session must not fire later.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!f.messenger.sent_to(USER).iter().any(|s| s.body() == prompts::TIMED_OUT));
    }

    #[tokio::test(start_paused = true)]
    async fn silence_at_age_step_aborts_without_submission() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        f.engine.handle(&photo(USER)).await.unwrap();
        assert_eq!(session(&f).await.unwrap().step, WizardStep::AwaitAge);

        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(session(&f).await.is_none());
        assert!(f.repo.list_pending().await.unwrap().is_empty());
        assert_eq!(f.messenger.last_to(USER).unwrap().body(), prompts::TIMED_OUT);
        assert!(!f.engine.handle(&text(USER, "25")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn each_answer_restarts_the_wait() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        f.engine.handle(&photo(USER)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(f.engine.handle(&text(USER, "not a number")).await.unwrap());
        assert_eq!(f.messenger.last_to(USER).unwrap().body(), crate::wizard::state::AGE_HINT);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert!(session(&f).await.is_some());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(session(&f).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_submission_blocks_entry() {
        let f = fixture();
        f.repo.enqueue_submission(fixtures::submission(USER)).await.unwrap();

        let err = f.engine.start(USER, USER).await.unwrap_err();
        assert!(err.is(ErrorCode::SubmissionAlreadyPending));
        assert!(session(&f).await.is_none());
        assert!(f.messenger.sent_to(USER).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn existing_profile_makes_it_an_edit() {
        let f = fixture();
        let sub = fixtures::submission(USER);
        f.repo.enqueue_submission(sub.clone()).await.unwrap();
        f.repo.resolve_submission(sub.id(), Decision::Approve).await.unwrap();

        f.engine.start(USER, USER).await.unwrap();
        assert!(session(&f).await.unwrap().editing);
        assert!(f.messenger.last_to(USER).unwrap().body().starts_with(prompts::EDITING_NOTICE));

        for event in full_answers() {
            f.engine.handle(&event).await.unwrap();
        }
        // The approved profile stays until the edit is reviewed.
        assert_eq!(f.repo.pool().await.unwrap().profiles.len(), 1);
        assert_eq!(f.repo.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_session_and_timer() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        assert!(f.engine.cancel(USER).await.unwrap());
        assert!(!f.engine.cancel(USER).await.unwrap());
        assert!(session(&f).await.is_none());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!f.messenger.sent_to(USER).iter().any(|s| s.body() == prompts::TIMED_OUT));
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_input_is_not_consumed() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();

        assert!(!f.engine.handle(&text(USER, "hello")).await.unwrap());
        assert!(!f.engine.handle(&photo(2)).await.unwrap());
        assert!(!f.engine.handle(&action(USER, "explore:0")).await.unwrap());
        assert_eq!(session(&f).await.unwrap().step, WizardStep::AwaitPhoto);

        f.engine.handle(&photo(USER)).await.unwrap();
        assert!(!f.engine.handle(&text(USER, "/cancel")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_button_payload_alerts_and_keeps_step() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        f.engine.handle(&photo(USER)).await.unwrap();
        f.engine.handle(&text(USER, "30")).await.unwrap();

        assert!(f.engine.handle(&action(USER, "gender:robot")).await.unwrap());
        assert_eq!(session(&f).await.unwrap().step, WizardStep::AwaitGender);
        match f.messenger.answers().last().unwrap() {
            Sent::Answer { alert, .. } => assert!(*alert),
            other => panic!("expected answer, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resume_rearms_or_expires_persisted_sessions() {
        let f = fixture();
        let docs = f.repo.documents();

        let stale = WizardSession::new(1, 1, false, Utc::now() - chrono::Duration::seconds(5));
        let fresh = WizardSession::new(2, 2, false, Utc::now() + chrono::Duration::seconds(30));
        docs.put(&wizard_key(1), &stale, None).await.unwrap();
        docs.put(&wizard_key(2), &fresh, None).await.unwrap();
        f.repo.documents().backend().set("wizard:3", "garbage".into(), None).await.unwrap();

        assert_eq!(f.engine.resume().await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(docs.get::<WizardSession>(&wizard_key(1)).await.unwrap().is_none());
        assert_eq!(f.messenger.last_to(1).unwrap().body(), prompts::TIMED_OUT);
        assert!(docs.get::<WizardSession>(&wizard_key(2)).await.unwrap().is_some());
        assert!(docs.list_keys("wizard:3").await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(docs.get::<WizardSession>(&wizard_key(2)).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_prompt_still_times_out() {
        let f = fixture();
        f.messenger.make_unreachable(USER);
        assert!(f.engine.start(USER, USER).await.is_err());
        assert!(session(&f).await.is_some());
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(session(&f).await.is_none());

        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        f.engine.handle(&photo(USER)).await.unwrap();
        f.messenger.make_unreachable(USER);
        assert!(f.engine.handle(&text(USER, "abc")).await.is_err());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(session(&f).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn late_timer_for_an_older_wait_still_expires_the_session() {
        let f = fixture();
        f.engine.start(USER, USER).await.unwrap();
        f.engine.handle(&photo(USER)).await.unwrap();
        let older = session(&f).await.unwrap().wait_id;

        f.engine.handle(&text(USER, "abc")).await.unwrap();
        assert_ne!(session(&f).await.unwrap().wait_id, older);

        // The older answer's task arms after the newer one.
        f.engine.arm(USER, older, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert!(session(&f).await.is_none());
        assert_eq!(f.messenger.last_to(USER).unwrap().body(), prompts::TIMED_OUT);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_admin_does_not_block_commit() {
        let f = fixture();
        f.messenger.make_unreachable(ADMINS[0]);
        f.engine.start(USER, USER).await.unwrap();
        for event in full_answers() {
            f.engine.handle(&event).await.unwrap();
        }
        assert_eq!(f.repo.list_pending().await.unwrap().len(), 1);
        assert_eq!(f.messenger.sent_to(ADMINS[1]).len(), 1);
        assert_eq!(f.messenger.last_to(USER).unwrap().body(), prompts::SUBMITTED);
    }
}
