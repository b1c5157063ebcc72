use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::{country_of, Profile};

// -- Weights: points per component, summing to 100 --
const W_LOCATION_EXACT: u32 = 30;
const W_LOCATION_COUNTRY: u32 = 15;
const W_AGE_CLOSE: u32 = 20; // |d| <= 2
const W_AGE_NEAR: u32 = 10; // 3 <= |d| <= 5
const W_INTEREST_EACH: u32 = 10;
const W_INTEREST_CAP: u32 = 40;
const W_RECENT: u32 = 10;

pub const MAX_SCORE: u32 =
    W_LOCATION_EXACT + W_AGE_CLOSE + W_INTEREST_CAP + W_RECENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchScore {
    pub score: u32,
    pub passes_filters: bool,
}

#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub profile: Profile,
    pub score: u32,
}

/// Exact location, else same country. Empty locations never match.
fn location_score(a: &str, b: &str) -> u32 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return W_LOCATION_EXACT;
    }
    let (ca, cb) = (country_of(a), country_of(b));
    if !ca.is_empty() && ca == cb {
        W_LOCATION_COUNTRY
    } else {
        0
    }
}

/// Zero ages are treated as unknown.
fn age_score(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 0;
    }
    match a.abs_diff(b) {
        0..=2 => W_AGE_CLOSE,
        3..=5 => W_AGE_NEAR,
        _ => 0,
    }
}

fn interest_tokens(raw: &str) -> HashSet<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn interests_score(a: &str, b: &str) -> u32 {
    let common = interest_tokens(a).intersection(&interest_tokens(b)).count() as u32;
    (common * W_INTEREST_EACH).min(W_INTEREST_CAP)
}

fn recency_score(last_active_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    if now - last_active_at < Duration::days(1) {
        W_RECENT
    } else {
        0
    }
}

/// Score `candidate` from `requester`'s point of view. The gender preference
/// is the only hard filter.
pub fn calculate_score(requester: &Profile, candidate: &Profile, now: DateTime<Utc>) -> MatchScore {
    if !requester.target_gender.accepts(candidate.gender) {
        return MatchScore {
            score: 0,
            passes_filters: false,
        };
    }

    let score = location_score(&requester.location, &candidate.location)
        + age_score(requester.age, candidate.age)
        + interests_score(&requester.interests, &candidate.interests)
        + recency_score(candidate.last_active_at, now);

    MatchScore {
        score,
        passes_filters: true,
    }
}

/// Candidates for `requester`, best first. The requester's own profile,
/// filtered-out genders and zero scores are dropped; ties keep pool order.
pub fn rank(requester: &Profile, pool: &[Profile], now: DateTime<Utc>) -> Vec<RankedMatch> {
    let mut ranked: Vec<RankedMatch> = pool
        .iter()
        .filter(|p| p.owner_account_id != requester.owner_account_id)
        .filter_map(|p| {
            let s = calculate_score(requester, p, now);
            (s.passes_filters && s.score > 0).then(|| RankedMatch {
                profile: p.clone(),
                score: s.score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
