//! Pure Telegram Bot API client.
//!
//! Covers what a long-polling bot with inline keyboards needs: fetching
//! updates, sending and editing messages, deleting messages and answering
//! callback queries.

use std::time::Duration;

pub mod error;
pub mod models;

pub use error::{Result, TelegramError};
pub use models::{
    CallbackQuery, Chat, EditMessageText, InlineKeyboardButton, InlineKeyboardMarkup, Message,
    SendMessage, Update, User,
};

use models::{AnswerCallbackQuery, ApiResponse, DeleteMessage, GetUpdates};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

const BASE_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub bot_token: String,
    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u32,
}

#[derive(Debug, Clone)]
pub struct TelegramService {
    options: TelegramOptions,
    client: Client,
    base_url: String,
}

impl TelegramService {
    pub fn new(options: TelegramOptions) -> Self {
        Self {
            options,
            client: Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Long-poll for new updates starting at `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: self.options.poll_timeout_secs,
            allowed_updates: vec!["message", "callback_query"],
        };
        // The HTTP timeout must outlive the server-side long poll.
        let timeout = Duration::from_secs(u64::from(self.options.poll_timeout_secs) + 10);
        self.call_with_timeout("getUpdates", &body, Some(timeout))
            .await
    }

    pub async fn send_message(&self, message: &SendMessage) -> Result<Message> {
        self.call("sendMessage", message).await
    }

    /// Edit text and keyboard of a message the bot sent earlier.
    pub async fn edit_message_text(&self, edit: &EditMessageText) -> Result<()> {
        // Result is either the edited Message or `true`; neither is needed.
        let _: serde_json::Value = self.call("editMessageText", edit).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: bool = self
            .call("deleteMessage", &DeleteMessage { chat_id, message_id })
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> Result<()> {
        let body = AnswerCallbackQuery {
            callback_query_id: callback_query_id.to_string(),
            text: text.map(str::to_string),
        };
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        self.call_with_timeout(method, body, None).await
    }

    async fn call_with_timeout<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let url = format!("{}/bot{}/{}", self.base_url, self.options.bot_token, method);

        let mut request = self.client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // Telegram reports failures inside the JSON envelope, with a non-2xx
        // status, so the body is decoded either way.
        let response: ApiResponse<T> = request.send().await?.json().await?;
        unwrap_response(method, response)
    }
}

fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        let err = TelegramError::Api {
            code: response.error_code.unwrap_or_default(),
            description: response.description.unwrap_or_default(),
        };
        if !err.is_not_modified() {
            tracing::warn!(method, error = %err, "Telegram API call failed");
        }
        return Err(err);
    }
    response
        .result
        .ok_or_else(|| TelegramError::Parse(format!("{method}: ok response without result")))
}
