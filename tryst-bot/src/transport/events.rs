use serde::{Deserialize, Serialize};

use super::messenger::{ActionRef, MessageRef};
use crate::models::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Photo,
    Action,
}

/// One update from the messenger, already attributed to an account.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Text {
        account_id: AccountId,
        chat_id: i64,
        text: String,
        sender_name: Option<String>,
    },
    Photo {
        account_id: AccountId,
        chat_id: i64,
        file_id: String,
    },
    /// A button press. `tag` and `payload` are the callback data split at the
    /// first `:`; `payload` is empty when there is no separator.
    Action {
        account_id: AccountId,
        chat_id: i64,
        action_ref: ActionRef,
        message_ref: Option<MessageRef>,
        tag: String,
        payload: String,
        sender_name: Option<String>,
    },
}

impl InboundEvent {
    pub fn account_id(&self) -> AccountId {
        match self {
            InboundEvent::Text { account_id, .. }
            | InboundEvent::Photo { account_id, .. }
            | InboundEvent::Action { account_id, .. } => *account_id,
        }
    }

    pub fn chat_id(&self) -> i64 {
        match self {
            InboundEvent::Text { chat_id, .. }
            | InboundEvent::Photo { chat_id, .. }
            | InboundEvent::Action { chat_id, .. } => *chat_id,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            InboundEvent::Text { .. } => InputKind::Text,
            InboundEvent::Photo { .. } => InputKind::Photo,
            InboundEvent::Action { .. } => InputKind::Action,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            InboundEvent::Action { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn action_ref(&self) -> Option<&ActionRef> {
        match self {
            InboundEvent::Action { action_ref, .. } => Some(action_ref),
            _ => None,
        }
    }

    pub fn sender_name(&self) -> Option<&str> {
        match self {
            InboundEvent::Text { sender_name, .. } | InboundEvent::Action { sender_name, .. } => {
                sender_name.as_deref()
            }
            InboundEvent::Photo { .. } => None,
        }
    }

    /// Builds an action event from raw callback data.
    pub fn action(
        account_id: AccountId,
        chat_id: i64,
        action_ref: ActionRef,
        message_ref: Option<MessageRef>,
        data: &str,
        sender_name: Option<String>,
    ) -> Self {
        let (tag, payload) = data.split_once(':').unwrap_or((data, ""));
        InboundEvent::Action {
            account_id,
            chat_id,
            action_ref,
            message_ref,
            tag: tag.to_string(),
            payload: payload.to_string(),
            sender_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_data_splits_at_first_colon() {
        let event = InboundEvent::action(1, 1, ActionRef("cb".into()), None, "react:like:0:abc", None);
        match event {
            InboundEvent::Action { tag, payload, .. } => {
                assert_eq!(tag, "react");
                assert_eq!(payload, "like:0:abc");
            }
            _ => panic!("expected action"),
        }
    }

    #[test]
    fn bare_tag_has_empty_payload() {
        let event = InboundEvent::action(1, 1, ActionRef("cb".into()), None, "inbox", None);
        assert_eq!(event.tag(), Some("inbox"));
        assert_eq!(event.kind(), InputKind::Action);
    }
}
