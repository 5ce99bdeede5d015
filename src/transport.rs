//! Shared HTTP plumbing for the collaborator clients.

use reqwest::{Client, StatusCode};
use serde_json::Value;

const USER_AGENT: &str = concat!("rusty-ingest/", env!("CARGO_PKG_VERSION"));

/// Build the reqwest client used by every collaborator.
pub(crate) fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Parse a base URL and strip any trailing slash from its path.
pub(crate) fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

/// Join a base URL and a relative path with exactly one slash.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Failure details read from a non-success response.
pub(crate) struct FailedResponse {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
    /// Message supplied by the service in a JSON `message`/`error` field.
    pub(crate) message: Option<String>,
}

/// Consume a non-success response, extracting the service's own error message when present.
pub(crate) async fn read_failure(response: reqwest::Response) -> FailedResponse {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = service_message(&body);
    FailedResponse {
        status,
        body,
        message,
    }
}

fn service_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "msg"].into_iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    })
}

/// Render an identifier that may arrive as a JSON string, number, or UUID object.
pub(crate) fn stringify_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Serde adapter accepting string or numeric identifiers.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = <Value as serde::Deserialize>::deserialize(deserializer)?;
    Ok(stringify_id(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_joins_with_single_slash() {
        assert_eq!(
            format_endpoint("http://host/base/", "/rest/v1/documents"),
            "http://host/base/rest/v1/documents"
        );
    }

    #[test]
    fn normalize_rejects_garbage_and_strips_slash() {
        assert!(normalize_base_url("not a url").is_err());
        let normalized = normalize_base_url("http://localhost:54321/api/").unwrap();
        assert_eq!(normalized, "http://localhost:54321/api");
    }

    #[test]
    fn service_message_prefers_message_field() {
        assert_eq!(
            service_message(r#"{"message":"duplicate key","code":"23505"}"#).as_deref(),
            Some("duplicate key")
        );
        assert_eq!(
            service_message(r#"{"error":"bucket missing"}"#).as_deref(),
            Some("bucket missing")
        );
        assert_eq!(service_message("plain text"), None);
        assert_eq!(service_message(r#"{"message":"  "}"#), None);
    }

    #[test]
    fn ids_stringify_across_shapes() {
        assert_eq!(stringify_id(json!("abc")), "abc");
        assert_eq!(stringify_id(json!(42)), "42");
        assert_eq!(stringify_id(json!({"uuid": "u-1"})), "u-1");
    }
}
