use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;

use crate::submission::SellingMarkup;

pub const DEFAULT_ORACLE_BASE_URL: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_ORACLE_MODEL: &str = "mistral-large-latest";

const REQUIRED: [&str; 4] = [
    "TELEGRAM_BOT_TOKEN",
    "NOTION_TOKEN",
    "OFFERS_DATABASE_ID",
    "ADVERTISERS_DATABASE_ID",
];

/// Application configuration loaded from environment variables.
///
/// Tokens are kept as secrets so `Debug` output never shows them.
#[derive(Debug)]
pub struct Config {
    pub telegram_bot_token: SecretString,
    pub notion_token: SecretString,
    pub offers_database_id: String,
    pub advertisers_database_id: String,
    /// Free-text deals are only accepted when this is set.
    pub oracle_api_key: Option<SecretString>,
    pub oracle_base_url: String,
    pub oracle_model: String,
    pub markup: SellingMarkup,
    pub session_timeout: Duration,
    pub store_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Every missing required variable is
    /// reported at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|name| get(*name).is_none())
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        let required = |name: &str| get(name).unwrap_or_default();

        let defaults = SellingMarkup::default();
        Ok(Self {
            telegram_bot_token: SecretString::from(required("TELEGRAM_BOT_TOKEN")),
            notion_token: SecretString::from(required("NOTION_TOKEN")),
            offers_database_id: required("OFFERS_DATABASE_ID"),
            advertisers_database_id: required("ADVERTISERS_DATABASE_ID"),
            oracle_api_key: get("MISTRAL_API_KEY").map(SecretString::from),
            oracle_base_url: get("ORACLE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ORACLE_BASE_URL.to_string()),
            oracle_model: get("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_ORACLE_MODEL.to_string()),
            markup: SellingMarkup {
                cpa: parse_or(&get, "SELLING_MARKUP_CPA", defaults.cpa)?,
                crg: parse_or(&get, "SELLING_MARKUP_CRG", defaults.crg)?,
                cpl: parse_or(&get, "SELLING_MARKUP_CPL", defaults.cpl)?,
            },
            session_timeout: Duration::from_secs(parse_or(&get, "SESSION_TIMEOUT_SECS", 3600)?),
            store_requests_per_second: parse_or(&get, "STORE_REQUESTS_PER_SECOND", 2)?,
        })
    }

    pub fn free_text_enabled(&self) -> bool {
        self.oracle_api_key.is_some()
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid number")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const BASE: [(&str, &str); 4] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("NOTION_TOKEN", "secret_notion"),
        ("OFFERS_DATABASE_ID", "offers"),
        ("ADVERTISERS_DATABASE_ID", "advertisers"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();

        assert_eq!(config.telegram_bot_token.expose_secret(), "123:abc");
        assert_eq!(config.offers_database_id, "offers");
        assert!(!config.free_text_enabled());
        assert_eq!(config.oracle_base_url, DEFAULT_ORACLE_BASE_URL);
        assert_eq!(config.oracle_model, DEFAULT_ORACLE_MODEL);
        assert_eq!(config.markup, SellingMarkup::default());
        assert_eq!(config.session_timeout, Duration::from_secs(3600));
        assert_eq!(config.store_requests_per_second, 2);
    }

    #[test]
    fn test_all_missing_variables_reported() {
        let err = Config::from_lookup(lookup(&[("NOTION_TOKEN", "x"), ("OFFERS_DATABASE_ID", " ")]))
            .unwrap_err()
            .to_string();
        assert_eq!(
            err,
            "Missing required environment variables: TELEGRAM_BOT_TOKEN, OFFERS_DATABASE_ID, ADVERTISERS_DATABASE_ID"
        );
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let mut vars = BASE.to_vec();
        vars.extend([
            ("MISTRAL_API_KEY", "m-key"),
            ("SELLING_MARKUP_CPA", "150"),
            ("SESSION_TIMEOUT_SECS", "60"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert!(config.free_text_enabled());
        assert_eq!(config.markup.cpa, 150.0);
        assert_eq!(config.session_timeout, Duration::from_secs(60));

        vars.push(("STORE_REQUESTS_PER_SECOND", "fast"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("STORE_REQUESTS_PER_SECOND"));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("123:abc"));
        assert!(!debug.contains("secret_notion"));
    }
}
