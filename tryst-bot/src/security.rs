//! Content screening for private messages and the new-profile heuristic
//! shown on the admin statistics page.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tryst_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::Profile;

struct ContentRule {
    regex: Regex,
    reason: &'static str,
}

/// Rejects messages that try to move the conversation off-platform or
/// contain blocked words.
pub struct ContentFilter {
    rules: Vec<ContentRule>,
    blocked_words: Vec<String>,
}

const DEFAULT_RULES: &[(&str, &str)] = &[
    (r"(?i)(phone\s*(number|no\.?)|whats\s*app|\bwa\.me\b)", "phone or WhatsApp contact"),
    (r"(?i)\bsnap\s*(chat)?\b", "Snapchat handle"),
    (r"(?i)\b(insta(gram)?|\big\b)", "Instagram handle"),
    (r"(?i)\b(facebook|fb\.com)\b", "Facebook link"),
    (r"\d{10,}", "long number"),
    (r"@\w+", "mention"),
];

const DEFAULT_BLOCKED_WORDS: &[&str] = &["idiot", "stupid", "whore"];

impl ContentFilter {
    pub fn default_rules() -> AppResult<Self> {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(pattern, reason)| {
                Regex::new(pattern)
                    .map(|regex| ContentRule { regex, reason })
                    .map_err(|e| AppError::internal(format!("invalid content rule {pattern}: {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            rules,
            blocked_words: DEFAULT_BLOCKED_WORDS.iter().map(|w| w.to_string()).collect(),
        })
    }

    /// `ContentRejected` with the first matching reason, if any rule fires.
    pub fn screen(&self, text: &str) -> AppResult<()> {
        if let Some(rule) = self.rules.iter().find(|r| r.regex.is_match(text)) {
            tracing::info!(reason = rule.reason, "message rejected by content rule");
            return Err(AppError::new(
                ErrorCode::ContentRejected,
                "For your safety, messages can't contain contact details or handles.",
            ));
        }

        let lowered = text.to_lowercase();
        if self.blocked_words.iter().any(|w| lowered.contains(w.as_str())) {
            tracing::info!("message rejected for blocked word");
            return Err(AppError::new(ErrorCode::ContentRejected, "⚠️ Inappropriate content."));
        }
        Ok(())
    }
}

/// Created within a day and carrying a near-empty bio.
pub fn is_suspicious(profile: &Profile, now: DateTime<Utc>) -> bool {
    now - profile.created_at < Duration::days(1) && profile.bio.chars().count() < 15
}

pub fn suspicious_profiles(profiles: &[Profile], now: DateTime<Utc>) -> Vec<&Profile> {
    profiles.iter().filter(|p| is_suspicious(p, now)).collect()
}
