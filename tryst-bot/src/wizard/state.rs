//! Onboarding wizard state: the persisted cursor and its pure transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::gazetteer::{find_country, Country};
use crate::models::{AccountId, Gender, TargetGender, BIO_MAX_CHARS, BIO_MIN_CHARS};
use crate::transport::{InboundEvent, InputKind};

/// Progresses linearly: AwaitPhoto → AwaitAge → AwaitGender →
/// AwaitTargetGender → AwaitCountry → AwaitRegion → AwaitInterests →
/// AwaitBio → commit. AwaitRegion is skipped for countries without regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    AwaitPhoto,
    AwaitAge,
    AwaitGender,
    AwaitTargetGender,
    AwaitCountry,
    AwaitRegion,
    AwaitInterests,
    AwaitBio,
}

impl WizardStep {
    pub fn input_kind(&self) -> InputKind {
        match self {
            Self::AwaitPhoto => InputKind::Photo,
            Self::AwaitAge | Self::AwaitInterests | Self::AwaitBio => InputKind::Text,
            Self::AwaitGender | Self::AwaitTargetGender | Self::AwaitCountry | Self::AwaitRegion => {
                InputKind::Action
            }
        }
    }

    /// Action tag the step's buttons carry.
    pub fn action_tag(&self) -> Option<&'static str> {
        match self {
            Self::AwaitGender => Some("gender"),
            Self::AwaitTargetGender => Some("target"),
            Self::AwaitCountry => Some("country"),
            Self::AwaitRegion => Some("region"),
            _ => None,
        }
    }

    /// The step after `self`, `None` when the draft is ready to commit.
    pub fn next(&self, draft: &WizardDraft) -> Option<WizardStep> {
        match self {
            Self::AwaitPhoto => Some(Self::AwaitAge),
            Self::AwaitAge => Some(Self::AwaitGender),
            Self::AwaitGender => Some(Self::AwaitTargetGender),
            Self::AwaitTargetGender => Some(Self::AwaitCountry),
            Self::AwaitCountry => match draft.country() {
                Some(c) if c.has_regions() => Some(Self::AwaitRegion),
                _ => Some(Self::AwaitInterests),
            },
            Self::AwaitRegion => Some(Self::AwaitInterests),
            Self::AwaitInterests => Some(Self::AwaitBio),
            Self::AwaitBio => None,
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitPhoto => "await_photo",
            Self::AwaitAge => "await_age",
            Self::AwaitGender => "await_gender",
            Self::AwaitTargetGender => "await_target_gender",
            Self::AwaitCountry => "await_country",
            Self::AwaitRegion => "await_region",
            Self::AwaitInterests => "await_interests",
            Self::AwaitBio => "await_bio",
        };
        write!(f, "{s}")
    }
}

/// Answers collected so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardDraft {
    pub photo_reference: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub target_gender: Option<TargetGender>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub interests: Option<String>,
    pub bio: Option<String>,
}

impl WizardDraft {
    pub fn country(&self) -> Option<&'static Country> {
        self.country.as_deref().and_then(find_country)
    }

    /// `"country - region"`, or the bare country when it has no regions.
    pub fn location(&self) -> Option<String> {
        let country = self.country.as_deref()?;
        Some(match self.region.as_deref() {
            Some(region) => format!("{country} - {region}"),
            None => country.to_string(),
        })
    }

    pub fn finish(&self) -> Option<CompletedDraft> {
        Some(CompletedDraft {
            photo_reference: self.photo_reference.clone()?,
            age: self.age?,
            gender: self.gender?,
            target_gender: self.target_gender?,
            location: self.location()?,
            interests: self.interests.clone()?,
            bio: self.bio.clone()?,
        })
    }
}

/// A draft with every answer present.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedDraft {
    pub photo_reference: String,
    pub age: u32,
    pub gender: Gender,
    pub target_gender: TargetGender,
    pub location: String,
    pub interests: String,
    pub bio: String,
}

/// What the current step is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPredicate {
    pub account_id: AccountId,
    pub kind: InputKind,
    pub tag: Option<&'static str>,
}

impl WaitPredicate {
    /// Slash commands never satisfy a text wait, so `/cancel` and friends
    /// always reach the command handlers.
    pub fn matches(&self, event: &InboundEvent) -> bool {
        if event.account_id() != self.account_id || event.kind() != self.kind {
            return false;
        }
        match event {
            InboundEvent::Text { text, .. } => !text.trim_start().starts_with('/'),
            InboundEvent::Action { tag, .. } => self.tag.map_or(true, |t| t == tag),
            InboundEvent::Photo { .. } => true,
        }
    }
}

/// The persisted cursor under `wizard:{account}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardSession {
    pub account_id: AccountId,
    pub chat_id: i64,
    pub step: WizardStep,
    pub draft: WizardDraft,
    /// Identifies the current wait; a timer only fires for the wait it was
    /// armed for.
    pub wait_id: Uuid,
    pub deadline: DateTime<Utc>,
    /// The account already has an approved profile; committing replaces it.
    pub editing: bool,
}

impl WizardSession {
    pub fn new(account_id: AccountId, chat_id: i64, editing: bool, deadline: DateTime<Utc>) -> Self {
        Self {
            account_id,
            chat_id,
            step: WizardStep::AwaitPhoto,
            draft: WizardDraft::default(),
            wait_id: Uuid::new_v4(),
            deadline,
            editing,
        }
    }

    pub fn predicate(&self) -> WaitPredicate {
        WaitPredicate {
            account_id: self.account_id,
            kind: self.step.input_kind(),
            tag: self.step.action_tag(),
        }
    }

    /// Starts a fresh wait on the current step.
    pub fn rearm(&mut self, deadline: DateTime<Utc>) {
        self.wait_id = Uuid::new_v4();
        self.deadline = deadline;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The event is not what the step waits for; it flows on untouched.
    Ignored,
    /// Invalid answer; the same step is asked again.
    Reprompt(&'static str),
    /// The answer was stored and `step` moved forward.
    Advanced,
    /// The last answer was stored; the draft is ready to commit.
    Completed(CompletedDraft),
    /// The cursor lacks answers it should have; the session cannot finish.
    Corrupt,
}

pub const AGE_HINT: &str = "❌ Please send your age as a number, e.g. 27.";
pub const GENDER_HINT: &str = "❌ Please pick one of the options.";
pub const COUNTRY_HINT: &str = "❌ Please pick a country from the list.";
pub const REGION_HINT: &str = "❌ Please pick a region from the list.";
pub const INTERESTS_HINT: &str = "❌ Tell us at least one thing you enjoy.";
pub const BIO_HINT: &str = "❌ Your bio must be between 10 and 500 characters.";

/// Applies one event to the session. Pure: no I/O, no clock.
pub fn advance(session: &mut WizardSession, event: &InboundEvent) -> StepOutcome {
    if !session.predicate().matches(event) {
        return StepOutcome::Ignored;
    }

    let draft = &mut session.draft;
    let accepted = match (session.step, event) {
        (WizardStep::AwaitPhoto, InboundEvent::Photo { file_id, .. }) => {
            draft.photo_reference = Some(file_id.clone());
            Ok(())
        }
        (WizardStep::AwaitAge, InboundEvent::Text { text, .. }) => parse_age(text)
            .map(|age| draft.age = Some(age))
            .ok_or(AGE_HINT),
        (WizardStep::AwaitGender, InboundEvent::Action { payload, .. }) => payload
            .parse::<Gender>()
            .map(|g| draft.gender = Some(g))
            .map_err(|_| GENDER_HINT),
        (WizardStep::AwaitTargetGender, InboundEvent::Action { payload, .. }) => payload
            .parse::<TargetGender>()
            .map(|t| draft.target_gender = Some(t))
            .map_err(|_| GENDER_HINT),
        (WizardStep::AwaitCountry, InboundEvent::Action { payload, .. }) => match find_country(payload) {
            Some(country) => {
                draft.country = Some(country.name.to_string());
                draft.region = None;
                Ok(())
            }
            None => Err(COUNTRY_HINT),
        },
        (WizardStep::AwaitRegion, InboundEvent::Action { payload, .. }) => {
            match draft.country().and_then(|c| c.find_region(payload)) {
                Some(region) => {
                    draft.region = Some(region.to_string());
                    Ok(())
                }
                None => Err(REGION_HINT),
            }
        }
        (WizardStep::AwaitInterests, InboundEvent::Text { text, .. }) => {
            let text = text.trim();
            if text.is_empty() {
                Err(INTERESTS_HINT)
            } else {
                draft.interests = Some(text.to_string());
                Ok(())
            }
        }
        (WizardStep::AwaitBio, InboundEvent::Text { text, .. }) => {
            let text = text.trim();
            let len = text.chars().count() as u64;
            if (BIO_MIN_CHARS..=BIO_MAX_CHARS).contains(&len) {
                draft.bio = Some(text.to_string());
                Ok(())
            } else {
                Err(BIO_HINT)
            }
        }
        // The predicate already pinned the input kind to the step.
        _ => return StepOutcome::Ignored,
    };

    if let Err(hint) = accepted {
        return StepOutcome::Reprompt(hint);
    }

    match session.step.next(&session.draft) {
        Some(next) => {
            session.step = next;
            StepOutcome::Advanced
        }
        None => match session.draft.finish() {
            Some(done) => StepOutcome::Completed(done),
            None => StepOutcome::Corrupt,
        },
    }
}

fn parse_age(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().filter(|age| *age > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ActionRef;

    fn session() -> WizardSession {
        WizardSession::new(1, 1, false, Utc::now())
    }

    fn text(account: AccountId, t: &str) -> InboundEvent {
        InboundEvent::Text { account_id: account, chat_id: account, text: t.into(), sender_name: None }
    }

    fn photo(account: AccountId) -> InboundEvent {
        InboundEvent::Photo { account_id: account, chat_id: account, file_id: "file-1".into() }
    }

    fn action(account: AccountId, data: &str) -> InboundEvent {
        InboundEvent::action(account, account, ActionRef("cb".into()), None, data, None)
    }

    fn walk(s: &mut WizardSession, events: &[InboundEvent]) -> StepOutcome {
        let mut last = StepOutcome::Ignored;
        for e in events {
            last = advance(s, e);
        }
        last
    }

    #[test]
    fn full_walk_with_region() {
        let mut s = session();
        let out = walk(
            &mut s,
            &[
                photo(1),
                text(1, "25"),
                action(1, "gender:female"),
                action(1, "target:male"),
                action(1, "country:Egypt"),
                action(1, "region:Cairo"),
                text(1, "music travel"),
                text(1, "this is a sufficiently long biography"),
            ],
        );
        match out {
            StepOutcome::Completed(done) => {
                assert_eq!(done.location, "Egypt - Cairo");
                assert_eq!(done.age, 25);
                assert_eq!(done.gender, Gender::Female);
                assert_eq!(done.target_gender, TargetGender::Male);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn country_without_regions_skips_region_step() {
        let mut s = session();
        walk(&mut s, &[photo(1), text(1, "30"), action(1, "gender:male"), action(1, "target:any")]);
        assert_eq!(advance(&mut s, &action(1, "country:Other")), StepOutcome::Advanced);
        assert_eq!(s.step, WizardStep::AwaitInterests);
        assert_eq!(s.draft.location().as_deref(), Some("Other"));
    }

    #[test]
    fn short_bio_reprompts_and_long_bio_completes() {
        let mut s = session();
        s.step = WizardStep::AwaitBio;
        s.draft = WizardDraft {
            photo_reference: Some("p".into()),
            age: Some(20),
            gender: Some(Gender::Male),
            target_gender: Some(TargetGender::Any),
            country: Some("Other".into()),
            region: None,
            interests: Some("chess".into()),
            bio: None,
        };
        assert_eq!(advance(&mut s, &text(1, "short")), StepOutcome::Reprompt(BIO_HINT));
        assert_eq!(s.step, WizardStep::AwaitBio);
        assert!(matches!(
            advance(&mut s, &text(1, "this is a sufficiently long biography")),
            StepOutcome::Completed(_)
        ));
    }

    #[test]
    fn invalid_ages_reprompt() {
        let mut s = session();
        s.step = WizardStep::AwaitAge;
        for bad in ["abc", "0", "-3", "2.5", ""] {
            assert_eq!(advance(&mut s, &text(1, bad)), StepOutcome::Reprompt(AGE_HINT), "{bad}");
        }
        assert_eq!(advance(&mut s, &text(1, " 41 ")), StepOutcome::Advanced);
        assert_eq!(s.draft.age, Some(41));
    }

    #[test]
    fn non_matching_input_is_ignored() {
        let mut s = session();
        // Wrong kind, wrong account, and a command while awaiting text.
        assert_eq!(advance(&mut s, &text(1, "hello")), StepOutcome::Ignored);
        assert_eq!(advance(&mut s, &photo(2)), StepOutcome::Ignored);
        assert_eq!(s.step, WizardStep::AwaitPhoto);

        s.step = WizardStep::AwaitAge;
        assert_eq!(advance(&mut s, &text(1, "/cancel")), StepOutcome::Ignored);

        s.step = WizardStep::AwaitGender;
        assert_eq!(advance(&mut s, &action(1, "explore:0")), StepOutcome::Ignored);
        assert_eq!(advance(&mut s, &action(1, "gender:robot")), StepOutcome::Reprompt(GENDER_HINT));
    }

    #[test]
    fn region_must_belong_to_chosen_country() {
        let mut s = session();
        s.step = WizardStep::AwaitRegion;
        s.draft.country = Some("Egypt".into());
        assert_eq!(advance(&mut s, &action(1, "region:Dubai")), StepOutcome::Reprompt(REGION_HINT));
        assert_eq!(advance(&mut s, &action(1, "region:Giza")), StepOutcome::Advanced);
    }

    #[test]
    fn missing_answers_are_corrupt() {
        let mut s = session();
        s.step = WizardStep::AwaitBio;
        assert_eq!(
            advance(&mut s, &text(1, "this is a sufficiently long biography")),
            StepOutcome::Corrupt
        );
    }

    #[test]
    fn step_serializes_snake_case() {
        let value = serde_json::to_value(WizardStep::AwaitTargetGender).unwrap();
        assert_eq!(value, "await_target_gender");
        assert_eq!(WizardStep::AwaitTargetGender.to_string(), "await_target_gender");
    }
}
