//! Chat transport seam and its Telegram implementation.

use async_trait::async_trait;
use serde::Serialize;
use telegram_client::{
    EditMessageText, InlineKeyboardButton, InlineKeyboardMarkup, SendMessage, TelegramError,
    TelegramService,
};
use tracing::debug;

use super::callback::Callback;
use crate::error::TransportError;

/// A message the bot can later edit or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub data: String,
}

impl Button {
    pub fn new(text: impl Into<String>, callback: &Callback) -> Self {
        Self {
            text: text.into(),
            data: callback.encode(),
        }
    }
}

/// Inline buttons under a message, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; empty rows are skipped.
    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Every button, in display order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError>;

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError>;

    async fn delete(&self, message: MessageRef) -> Result<(), TransportError>;

    /// Stop the client's spinner on a pressed button.
    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError>;
}

pub struct TelegramTransport {
    service: TelegramService,
}

impl TelegramTransport {
    pub fn new(service: TelegramService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &TelegramService {
        &self.service
    }
}

fn markup(keyboard: Option<&Keyboard>) -> Option<InlineKeyboardMarkup> {
    keyboard.map(|keyboard| InlineKeyboardMarkup {
        inline_keyboard: keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| InlineKeyboardButton::callback(&button.text, &button.data))
                    .collect()
            })
            .collect(),
    })
}

fn transport_error(err: TelegramError) -> TransportError {
    TransportError(err.to_string())
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let message = self
            .service
            .send_message(&SendMessage {
                chat_id,
                text: text.to_string(),
                reply_markup: markup(keyboard),
            })
            .await
            .map_err(transport_error)?;

        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let edit = EditMessageText {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text: text.to_string(),
            reply_markup: markup(keyboard),
        };
        match self.service.edit_message_text(&edit).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_modified() => {
                debug!(message_id = message.message_id, "Message unchanged, edit skipped");
                Ok(())
            }
            Err(err) => Err(transport_error(err)),
        }
    }

    async fn delete(&self, message: MessageRef) -> Result<(), TransportError> {
        self.service
            .delete_message(message.chat_id, message.message_id)
            .await
            .map_err(transport_error)
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        self.service
            .answer_callback_query(callback_id, None)
            .await
            .map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_maps_to_inline_markup() {
        let keyboard = Keyboard::new()
            .row(vec![])
            .row(vec![
                Button::new("Approve", &Callback::Approve(0)),
                Button::new("Reject", &Callback::Reject(0)),
            ])
            .row(vec![Button::new("Submit", &Callback::Submit)]);

        assert_eq!(keyboard.rows.len(), 2);

        let markup = markup(Some(&keyboard)).unwrap();
        assert_eq!(markup.inline_keyboard[0][1].callback_data, "reject:0");
        assert_eq!(markup.inline_keyboard[1][0].text, "Submit");
        assert!(super::markup(None).is_none());
    }
}
