//! Pure Notion REST API client.
//!
//! A minimal client for the Notion API: query a database and create pages in
//! it. Property values are plain JSON built with [`types::property`].
//!
//! # Example
//!
//! ```rust,ignore
//! use notion_client::{property, CreatePage, DatabaseQuery, NotionClient};
//!
//! let client = NotionClient::new("secret_token".into());
//!
//! let found = client
//!     .query_database(&companies_db, &DatabaseQuery::title_equals("Acme"))
//!     .await?;
//!
//! let mut props = serde_json::Map::new();
//! props.insert("title".into(), property::title("Acme"));
//! let page = client.create_page(&CreatePage::in_database(&companies_db, props)).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{NotionError, Result};
pub use types::{property, CreatePage, DatabaseQuery, Page, Parent, QueryResults};

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use types::ApiErrorBody;

const BASE_URL: &str = "https://api.notion.com/v1";

/// API version pinned for every request.
const NOTION_VERSION: &str = "2022-06-28";

#[derive(Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Query a database. Returns the first page of results.
    pub async fn query_database(
        &self,
        database_id: &str,
        query: &DatabaseQuery,
    ) -> Result<QueryResults> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let request = self.authorized(self.client.post(&url)).json(query);
        let results: QueryResults = self.execute(request).await?;

        tracing::debug!(
            database_id,
            count = results.results.len(),
            "Notion database queried"
        );
        Ok(results)
    }

    /// Create a page inside a database.
    pub async fn create_page(&self, page: &CreatePage) -> Result<Page> {
        let url = format!("{}/pages", self.base_url);
        let request = self.authorized(self.client.post(&url)).json(page);
        let created: Page = self.execute(request).await?;

        tracing::debug!(
            database_id = %page.parent.database_id,
            page_id = %created.id,
            "Notion page created"
        );
        Ok(created)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let value: serde_json::Value = resp.json().await?;
        serde_json::from_value(value).map_err(|e| NotionError::Parse(e.to_string()))
    }
}

fn api_error(status: StatusCode, body: &str) -> NotionError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return NotionError::RateLimited;
    }
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => NotionError::Api {
            status: status.as_u16(),
            code: err.code,
            message: err.message,
        },
        Err(_) => NotionError::Api {
            status: status.as_u16(),
            code: "unknown".to_string(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_parses_notion_body() {
        let body = r#"{"object":"error","status":400,"code":"validation_error","message":"Title is not a property"}"#;
        match api_error(StatusCode::BAD_REQUEST, body) {
            NotionError::Api { status, code, message } => {
                assert_eq!(status, 400);
                assert_eq!(code, "validation_error");
                assert_eq!(message, "Title is not a property");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_keeps_unstructured_body() {
        match api_error(StatusCode::BAD_GATEWAY, "upstream down") {
            NotionError::Api { code, message, .. } => {
                assert_eq!(code, "unknown");
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_status() {
        assert!(matches!(
            api_error(StatusCode::TOO_MANY_REQUESTS, ""),
            NotionError::RateLimited
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = NotionClient::new("t".into()).with_base_url("http://localhost:9000/v1/");
        assert_eq!(client.base_url, "http://localhost:9000/v1");
    }
}
