use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub type AccountId = i64;

pub const BIO_MIN_CHARS: u64 = 10;
pub const BIO_MAX_CHARS: u64 = 500;
pub const DEFAULT_TARGET_AGE_RANGE: (u32, u32) = (18, 40);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetGender {
    Male,
    Female,
    Other,
    #[default]
    Any,
}

impl TargetGender {
    pub const ALL: [TargetGender; 4] = [
        TargetGender::Male,
        TargetGender::Female,
        TargetGender::Other,
        TargetGender::Any,
    ];

    /// Hard filter applied by browsing and matching.
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            TargetGender::Any => true,
            TargetGender::Male => gender == Gender::Male,
            TargetGender::Female => gender == Gender::Female,
            TargetGender::Other => gender == Gender::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetGender::Male => "male",
            TargetGender::Female => "female",
            TargetGender::Other => "other",
            TargetGender::Any => "any",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetGender::Male => "Men",
            TargetGender::Female => "Women",
            TargetGender::Other => "Other",
            TargetGender::Any => "Anyone",
        }
    }
}

impl std::str::FromStr for TargetGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(TargetGender::Male),
            "female" => Ok(TargetGender::Female),
            "other" => Ok(TargetGender::Other),
            "any" => Ok(TargetGender::Any),
            _ => Err(format!("unknown target gender: {s}")),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_age_range() -> (u32, u32) {
    DEFAULT_TARGET_AGE_RANGE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    pub id: Uuid,
    pub owner_account_id: AccountId,
    #[validate(length(min = 1))]
    pub photo_reference: String,
    #[validate(length(min = 10, max = 500))]
    pub bio: String,
    #[validate(range(min = 1))]
    pub age: u32,
    pub gender: Gender,
    #[validate(length(min = 1))]
    pub location: String,
    pub interests: String,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub dislikes_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub show_age: bool,
    #[serde(default = "default_true")]
    pub show_location: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub target_gender: TargetGender,
    #[serde(default = "default_age_range")]
    pub target_age_range: (u32, u32),
}

impl Profile {
    /// Text before the first `" - "`, or the whole location.
    pub fn country(&self) -> &str {
        country_of(&self.location)
    }
}

pub fn country_of(location: &str) -> &str {
    location.split(" - ").next().unwrap_or(location)
}

/// A completed wizard draft waiting for an admin decision. Serialized flat so
/// a queued entry reads like the profile it will become.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PendingSubmission {
    #[serde(flatten)]
    #[validate]
    pub profile: Profile,
    pub submitted_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    pub fn owner(&self) -> AccountId {
        self.profile.owner_account_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_account_id: AccountId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub liked_profile_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub favorite_profile_ids: BTreeSet<Uuid>,
    /// Newest last.
    #[serde(default)]
    pub inbox: Vec<Message>,
    #[serde(default = "default_true")]
    pub notification_opt_in: bool,
    #[serde(default)]
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            banned: false,
            liked_profile_ids: BTreeSet::new(),
            favorite_profile_ids: BTreeSet::new(),
            inbox: Vec::new(),
            notification_opt_in: true,
            is_premium: false,
            created_at: now,
        }
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.iter().filter(|m| !m.read).count()
    }
}

/// The shared aggregate stored under the `data` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolDocument {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub pending: Vec<PendingSubmission>,
    #[serde(default)]
    pub force_channels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Decline,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Decline => "decline",
        }
    }
}
