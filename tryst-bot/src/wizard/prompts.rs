use super::gazetteer::{find_country, COUNTRIES};
use super::state::{WizardDraft, WizardStep};
use crate::models::{Gender, PendingSubmission, TargetGender};
use crate::transport::{Button, Keyboard};

const BUTTONS_PER_ROW: usize = 3;

pub const PHOTO: &str = "📸 First, send the photo you want on your profile.";
pub const EDITING_NOTICE: &str = "📝 You are editing your profile. The current one stays visible until the new version is approved.";
pub const SUBMITTED: &str = "✅ Your profile was sent for review. You will be notified once it is approved.";
pub const TIMED_OUT: &str = "⌛ Profile creation timed out. Start again whenever you are ready.";
pub const CANCELLED: &str = "Profile creation cancelled. Nothing was saved.";
pub const NOTHING_TO_CANCEL: &str = "There is nothing to cancel.";
pub const ALREADY_PENDING: &str = "⚠️ Your profile is already waiting for review.";

/// Message and keyboard that open `step`.
pub fn for_step(step: WizardStep, draft: &WizardDraft) -> (String, Option<Keyboard>) {
    match step {
        WizardStep::AwaitPhoto => (PHOTO.into(), None),
        WizardStep::AwaitAge => ("🎂 How old are you? Numbers only.".into(), None),
        WizardStep::AwaitGender => ("⚧ What is your gender?".into(), Some(gender_keyboard())),
        WizardStep::AwaitTargetGender => ("🎯 Who are you looking for?".into(), Some(target_keyboard())),
        WizardStep::AwaitCountry => ("🌍 Pick your country:".into(), Some(country_keyboard())),
        WizardStep::AwaitRegion => {
            let country = draft.country.as_deref().unwrap_or_default();
            (format!("✅ Country: {country}\n\n🏙 Pick your region:"), region_keyboard(country))
        }
        WizardStep::AwaitInterests => ("🎨 What are your interests?".into(), None),
        WizardStep::AwaitBio => ("📝 Write a short bio (10 to 500 characters).".into(), None),
    }
}

fn gender_keyboard() -> Keyboard {
    Keyboard::new().row(
        Gender::ALL
            .iter()
            .map(|g| Button::new(g.label(), format!("gender:{}", g.as_str())))
            .collect(),
    )
}

fn target_keyboard() -> Keyboard {
    let buttons: Vec<Button> = TargetGender::ALL
        .iter()
        .map(|t| Button::new(t.label(), format!("target:{}", t.as_str())))
        .collect();
    chunked(buttons, 2)
}

fn country_keyboard() -> Keyboard {
    let buttons = COUNTRIES
        .iter()
        .map(|c| Button::new(c.name, format!("country:{}", c.name)))
        .collect();
    chunked(buttons, BUTTONS_PER_ROW)
}

fn region_keyboard(country: &str) -> Option<Keyboard> {
    let country = find_country(country)?;
    let buttons = country
        .regions
        .iter()
        .map(|r| Button::new(*r, format!("region:{r}")))
        .collect();
    Some(chunked(buttons, BUTTONS_PER_ROW))
}

fn chunked(buttons: Vec<Button>, per_row: usize) -> Keyboard {
    buttons
        .chunks(per_row)
        .fold(Keyboard::new(), |kb, row| kb.row(row.to_vec()))
}

/// Caption shown to admins next to the submitted photo.
pub fn review_caption(sub: &PendingSubmission) -> String {
    let p = &sub.profile;
    format!(
        "👤 New profile for review\n\nAccount: {}\nAge: {}\nGender: {}\nLooking for: {}\nLocation: {}\nInterests: {}\nBio: {}",
        p.owner_account_id,
        p.age,
        p.gender.label(),
        p.target_gender.label(),
        p.location,
        p.interests,
        p.bio,
    )
}

pub fn review_keyboard(sub: &PendingSubmission) -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("✅ Approve", format!("approve:{}", sub.id())),
        Button::new("❌ Decline", format!("decline:{}", sub.id())),
    ])
}
