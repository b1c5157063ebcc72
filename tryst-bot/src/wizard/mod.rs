//! Guided profile creation: a persisted cursor per account, advanced one
//! inbound event at a time and committed to the moderation queue.

mod engine;
pub mod gazetteer;
pub mod prompts;
pub mod state;

pub use engine::WizardEngine;
pub use state::{WizardSession, WizardStep};
