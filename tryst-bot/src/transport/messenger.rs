use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tryst_shared::errors::AppResult;

/// A sent message that can later be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Handle for acknowledging a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn button(self, label: impl Into<String>, data: impl Into<String>) -> Self {
        self.row(vec![Button::new(label, data)])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Outbound side of the messenger. Chat ids of private chats equal account ids.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<MessageRef>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<MessageRef>;

    async fn edit_message(&self, message: &MessageRef, text: &str, keyboard: Option<Keyboard>) -> AppResult<()>;

    /// Acknowledges a button press, optionally with a toast or alert.
    async fn answer_action(&self, action: &ActionRef, text: Option<&str>, alert: bool) -> AppResult<()>;
}
