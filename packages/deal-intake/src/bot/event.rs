//! What the bot reacts to, independent of the chat platform.

use chrono::{DateTime, Utc};
use telegram_client::Update;

use super::transport::MessageRef;
use crate::review::UserId;

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Text {
        user: UserId,
        chat_id: i64,
        message_id: i64,
        text: String,
        sent_at: DateTime<Utc>,
    },
    Button {
        user: UserId,
        /// The message carrying the pressed button.
        message: MessageRef,
        callback_id: String,
        data: String,
    },
}

impl InboundEvent {
    pub fn user(&self) -> UserId {
        match self {
            Self::Text { user, .. } | Self::Button { user, .. } => *user,
        }
    }

    /// The event carried by a Telegram update, if the bot cares about it.
    ///
    /// Non-text messages and button presses on messages too old to carry
    /// their content are ignored.
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let message = query.message?;
            return Some(Self::Button {
                user: query.from.id,
                message: MessageRef {
                    chat_id: message.chat.id,
                    message_id: message.message_id,
                },
                callback_id: query.id,
                data: query.data.unwrap_or_default(),
            });
        }

        let message = update.message?;
        let text = message.text?;
        Some(Self::Text {
            user: message.from.map_or(message.chat.id, |from| from.id),
            chat_id: message.chat.id,
            message_id: message.message_id,
            text,
            sent_at: DateTime::from_timestamp(message.date, 0).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(raw: &str) -> Update {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_text_message() {
        let event = InboundEvent::from_update(update(
            r#"{"update_id":1,"message":{"message_id":9,"date":1700000000,"chat":{"id":-5},"from":{"id":42,"first_name":"A"},"text":"hello"}}"#,
        ))
        .unwrap();

        assert_eq!(
            event,
            InboundEvent::Text {
                user: 42,
                chat_id: -5,
                message_id: 9,
                text: "hello".into(),
                sent_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_button_press() {
        let event = InboundEvent::from_update(update(
            r#"{"update_id":2,"callback_query":{"id":"cb","from":{"id":42},"message":{"message_id":3,"date":0,"chat":{"id":42}},"data":"next:0"}}"#,
        ))
        .unwrap();

        match event {
            InboundEvent::Button {
                user,
                message,
                callback_id,
                data,
            } => {
                assert_eq!(user, 42);
                assert_eq!(message, MessageRef { chat_id: 42, message_id: 3 });
                assert_eq!(callback_id, "cb");
                assert_eq!(data, "next:0");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_ignored_updates() {
        assert!(InboundEvent::from_update(update(r#"{"update_id":3}"#)).is_none());
        assert!(InboundEvent::from_update(update(
            r#"{"update_id":4,"message":{"message_id":1,"date":0,"chat":{"id":1}}}"#
        ))
        .is_none());
    }
}
