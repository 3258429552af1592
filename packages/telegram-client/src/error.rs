use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelegramError>;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl TelegramError {
    /// Editing a message to identical content is rejected by the API; callers
    /// usually want to ignore it.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_modified_detection() {
        let err = TelegramError::Api {
            code: 400,
            description: "Bad Request: message is not modified: specified new message content and reply markup are exactly the same".into(),
        };
        assert!(err.is_not_modified());

        let err = TelegramError::Api {
            code: 400,
            description: "Bad Request: chat not found".into(),
        };
        assert!(!err.is_not_modified());
    }
}
