//! Minimal Telegram Bot API client: long polling plus the handful of send and
//! edit calls the matchmaking bot needs.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram rejects longer `text` payloads.
pub const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram rejects longer photo captions.
pub const TELEGRAM_MAX_CAPTION_LENGTH: usize = 1024;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Clone)]
pub struct TelegramClient {
    bot_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            base_url: TELEGRAM_API.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> AppResult<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let envelope: Envelope<T> = resp.json().await?;
        match envelope {
            Envelope { ok: true, result: Some(result), .. } => Ok(result),
            Envelope { description, .. } => Err(AppError::Internal(anyhow::anyhow!(
                "telegram {method} failed ({status}): {}",
                description.unwrap_or_default()
            ))),
        }
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> AppResult<Vec<Update>> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> AppResult<Message> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": truncate(text, TELEGRAM_MAX_MESSAGE_LENGTH),
        });
        if let Some(markup) = markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        self.call("sendMessage", body).await
    }

    /// Sends a photo by Telegram file id.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        file_id: &str,
        caption: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> AppResult<Message> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "photo": file_id,
            "caption": truncate(caption, TELEGRAM_MAX_CAPTION_LENGTH),
        });
        if let Some(markup) = markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        self.call("sendPhoto", body).await
    }

    /// Replaces the caption of a photo message, falling back to its text for
    /// plain messages.
    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> AppResult<()> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "caption": truncate(text, TELEGRAM_MAX_CAPTION_LENGTH),
        });
        body["reply_markup"] = serde_json::to_value(markup.cloned().unwrap_or_default())?;

        match self.call::<serde_json::Value>("editMessageCaption", body.clone()).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::debug!(error = %err, "caption edit failed, retrying as text edit");
                let obj = body.as_object_mut().ok_or_else(|| AppError::internal("edit body is not an object"))?;
                obj.remove("caption");
                obj.insert("text".into(), truncate(text, TELEGRAM_MAX_MESSAGE_LENGTH).into());
                self.call::<serde_json::Value>("editMessageText", body).await?;
                Ok(())
            }
        }
    }

    pub async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>, alert: bool) -> AppResult<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_id, "show_alert": alert });
        if let Some(text) = text {
            body["text"] = text.into();
        }
        self.call::<bool>("answerCallbackQuery", body).await?;
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl PhotoSize {
    /// Telegram lists sizes smallest first; the last one is the original.
    pub fn largest(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
        sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height))
    }
}
