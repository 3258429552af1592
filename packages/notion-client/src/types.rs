use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Body for `POST /databases/{id}/query`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

impl DatabaseQuery {
    /// Match pages whose title property equals `value` exactly.
    pub fn title_equals(value: &str) -> Self {
        Self {
            filter: Some(json!({
                "property": "title",
                "title": { "equals": value }
            })),
            ..Default::default()
        }
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// Response of a database query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResults {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// The subset of a Notion page object the client exposes.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body for `POST /pages`.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePage {
    pub parent: Parent,
    pub properties: Map<String, Value>,
}

impl CreatePage {
    pub fn in_database(database_id: impl Into<String>, properties: Map<String, Value>) -> Self {
        Self {
            parent: Parent {
                database_id: database_id.into(),
            },
            properties,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Parent {
    pub database_id: String,
}

/// Error object returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Builders for page property values.
pub mod property {
    use serde_json::{json, Value};

    pub fn title(content: &str) -> Value {
        json!({ "title": [{ "text": { "content": content } }] })
    }

    pub fn select(name: &str) -> Value {
        json!({ "select": { "name": name } })
    }

    pub fn multi_select<S: AsRef<str>>(names: &[S]) -> Value {
        let options: Vec<Value> = names
            .iter()
            .map(|n| json!({ "name": n.as_ref() }))
            .collect();
        json!({ "multi_select": options })
    }

    pub fn number(value: f64) -> Value {
        json!({ "number": value })
    }

    pub fn relation<S: AsRef<str>>(page_ids: &[S]) -> Value {
        let ids: Vec<Value> = page_ids
            .iter()
            .map(|id| json!({ "id": id.as_ref() }))
            .collect();
        json!({ "relation": ids })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_equals_filter() {
        let query = DatabaseQuery::title_equals("Acme").page_size(1);
        let body = serde_json::to_value(&query).unwrap();
        assert_eq!(body["filter"]["title"]["equals"], "Acme");
        assert_eq!(body["page_size"], 1);
        assert!(body.get("start_cursor").is_none());
    }

    #[test]
    fn test_property_builders() {
        assert_eq!(property::title("x")["title"][0]["text"]["content"], "x");
        assert_eq!(property::select("Active")["select"]["name"], "Active");
        assert_eq!(property::multi_select(&["a", "b"])["multi_select"][1]["name"], "b");
        assert_eq!(property::number(1.5)["number"], 1.5);
        assert_eq!(property::relation(&["p1"])["relation"][0]["id"], "p1");
    }

    #[test]
    fn test_query_results_tolerate_missing_cursor() {
        let results: QueryResults =
            serde_json::from_str(r#"{"object":"list","results":[{"id":"abc"}]}"#).unwrap();
        assert_eq!(results.results[0].id, "abc");
        assert!(!results.has_more);
    }
}
