//! Messenger boundary: inbound events, the outbound [`Messenger`] trait and
//! the Telegram implementation of both.

mod events;
mod messenger;
pub mod poller;
pub mod telegram;

#[cfg(test)]
pub mod recording;

pub use events::{InboundEvent, InputKind};
pub use messenger::{ActionRef, Button, Keyboard, MessageRef, Messenger};
