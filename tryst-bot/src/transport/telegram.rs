use async_trait::async_trait;
use tryst_shared::clients::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, PhotoSize, TelegramClient, Update,
};
use tryst_shared::errors::AppResult;

use super::{ActionRef, InboundEvent, Keyboard, MessageRef, Messenger};

/// [`Messenger`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    client: TelegramClient,
}

impl TelegramMessenger {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

fn markup(keyboard: Option<Keyboard>) -> Option<InlineKeyboardMarkup> {
    keyboard.map(|k| InlineKeyboardMarkup {
        inline_keyboard: k
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton {
                        text: b.label,
                        callback_data: b.data,
                    })
                    .collect()
            })
            .collect(),
    })
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<MessageRef> {
        let sent = self.client.send_message(chat_id, text, markup(keyboard).as_ref()).await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &str,
        caption: &str,
        keyboard: Option<Keyboard>,
    ) -> AppResult<MessageRef> {
        let sent = self
            .client
            .send_photo(chat_id, photo, caption, markup(keyboard).as_ref())
            .await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(&self, message: &MessageRef, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        self.client
            .edit_message(message.chat_id, message.message_id, text, markup(keyboard).as_ref())
            .await
    }

    async fn answer_action(&self, action: &ActionRef, text: Option<&str>, alert: bool) -> AppResult<()> {
        self.client.answer_callback_query(&action.0, text, alert).await
    }
}

/// Maps a Bot API update onto an [`InboundEvent`]. Updates the bot does not
/// act on (stickers, edits, channel posts) map to `None`.
pub fn event_from_update(update: Update) -> Option<InboundEvent> {
    if let Some(cb) = update.callback_query {
        let message_ref = cb.message.as_ref().map(|m| MessageRef {
            chat_id: m.chat.id,
            message_id: m.message_id,
        });
        let chat_id = message_ref.map_or(cb.from.id, |m| m.chat_id);
        let sender_name = display_name(cb.from.username.as_deref(), cb.from.first_name.as_deref());
        return Some(InboundEvent::action(
            cb.from.id,
            chat_id,
            ActionRef(cb.id),
            message_ref,
            cb.data.as_deref().unwrap_or_default(),
            sender_name,
        ));
    }

    let message = update.message?;
    let from = message.from?;
    let chat_id = message.chat.id;

    if let Some(sizes) = message.photo.as_deref() {
        let photo = PhotoSize::largest(sizes)?;
        return Some(InboundEvent::Photo {
            account_id: from.id,
            chat_id,
            file_id: photo.file_id.clone(),
        });
    }

    message.text.map(|text| InboundEvent::Text {
        account_id: from.id,
        chat_id,
        text,
        sender_name: display_name(from.username.as_deref(), from.first_name.as_deref()),
    })
}

fn display_name(username: Option<&str>, first_name: Option<&str>) -> Option<String> {
    username
        .map(|u| format!("@{u}"))
        .or_else(|| first_name.map(str::to_string))
}
