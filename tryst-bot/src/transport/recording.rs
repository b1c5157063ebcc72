//! In-memory [`Messenger`] for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tryst_shared::errors::{AppError, AppResult};

use super::{ActionRef, Keyboard, MessageRef, Messenger};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String, keyboard: Option<Keyboard> },
    Photo { chat_id: i64, photo: String, caption: String, keyboard: Option<Keyboard> },
    Edit { message: MessageRef, text: String },
    Answer { action: String, text: Option<String>, alert: bool },
}

impl Sent {
    pub fn chat_id(&self) -> Option<i64> {
        match self {
            Sent::Text { chat_id, .. } | Sent::Photo { chat_id, .. } => Some(*chat_id),
            Sent::Edit { message, .. } => Some(message.chat_id),
            Sent::Answer { .. } => None,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Sent::Text { text, .. } | Sent::Edit { text, .. } => text,
            Sent::Photo { caption, .. } => caption,
            Sent::Answer { text, .. } => text.as_deref().unwrap_or(""),
        }
    }

    pub fn keyboard(&self) -> Option<&Keyboard> {
        match self {
            Sent::Text { keyboard, .. } | Sent::Photo { keyboard, .. } => keyboard.as_ref(),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    unreachable: Mutex<HashSet<i64>>,
    next_id: AtomicI64,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `chat_id` fail from now on, as for a user who blocked the bot.
    pub fn make_unreachable(&self, chat_id: i64) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| s.chat_id() == Some(chat_id)).collect()
    }

    pub fn last_to(&self, chat_id: i64) -> Option<Sent> {
        self.sent_to(chat_id).pop()
    }

    pub fn answers(&self) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| matches!(s, Sent::Answer { .. })).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    fn deliver(&self, chat_id: i64, sent: Sent) -> AppResult<MessageRef> {
        if self.unreachable.lock().unwrap().contains(&chat_id) {
            return Err(AppError::Internal(anyhow::anyhow!("chat {chat_id} unreachable")));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(MessageRef {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<MessageRef> {
        self.deliver(chat_id, Sent::Text { chat_id, text: text.to_string(), keyboard })
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<MessageRef> {
        self.deliver(
            chat_id,
            Sent::Photo {
                chat_id,
                photo: photo.to_string(),
                caption: caption.to_string(),
                keyboard,
            },
        )
    }

    async fn edit_message(&self, message: &MessageRef, text: &str, _keyboard: Option<Keyboard>) -> AppResult<()> {
        self.deliver(message.chat_id, Sent::Edit { message: *message, text: text.to_string() })?;
        Ok(())
    }

    async fn answer_action(&self, action: &ActionRef, text: Option<&str>, alert: bool) -> AppResult<()> {
        self.sent.lock().unwrap().push(Sent::Answer {
            action: action.0.clone(),
            text: text.map(str::to_string),
            alert,
        });
        Ok(())
    }
}
