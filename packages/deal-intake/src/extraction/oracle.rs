//! The text-structuring oracle seam.

use async_trait::async_trait;
use openai_client::{OpenAIClient, OpenAIError};

use crate::error::OracleError;

/// Anything that can answer a system + user prompt with a JSON document.
///
/// Implementations report rate limiting as [`OracleError::RateLimited`] so
/// callers can back off.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, OracleError>;
}

/// Oracle backed by any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAIOracle {
    client: OpenAIClient,
    model: String,
}

impl OpenAIOracle {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Oracle for OpenAIOracle {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, OracleError> {
        let content = self
            .client
            .json_completion(&self.model, system, user)
            .await
            .map_err(oracle_error)?;
        tracing::debug!(model = %self.model, response_len = content.len(), "Oracle response");
        Ok(content)
    }
}

fn oracle_error(err: OpenAIError) -> OracleError {
    if err.is_rate_limited() {
        OracleError::RateLimited(err.to_string())
    } else {
        OracleError::Failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_retryable_error() {
        let err = oracle_error(OpenAIError::RateLimited("slow down".into()));
        assert!(err.is_rate_limited());

        let err = oracle_error(OpenAIError::Api {
            status: 500,
            message: "boom".into(),
        });
        assert!(matches!(err, OracleError::Failed(msg) if msg.contains("boom")));
    }
}
