//! Formatting helpers shared across MCP handlers and resources.

use crate::processing::RetryPolicy;
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::json;

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Top-level settings snapshot describing ingestion defaults.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SettingsSnapshot {
    /// Retry schedule applied to single-file ingestion.
    pub(crate) retry: RetrySettingsSnapshot,
}

/// Retry defaults exposed to clients.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct RetrySettingsSnapshot {
    /// Attempts made before giving up, including the first.
    pub(crate) max_attempts: u32,
    /// Delay before the first retry; doubles after every further failure.
    pub(crate) base_delay_ms: u64,
}

impl From<RetryPolicy> for SettingsSnapshot {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            retry: RetrySettingsSnapshot {
                max_attempts: policy.attempts(),
                base_delay_ms: policy.base_delay.as_millis() as u64,
            },
        }
    }
}

/// Recommended tool flow returned by the usage resource.
pub(crate) fn usage_payload() -> serde_json::Value {
    json!({
        "title": "Rusty Ingest MCP Usage",
        "policy": [
            "Pass file paths to `ingest-file`; do not paste document contents into prompts.",
            "Use `segment-text` to preview how text splits before storing it.",
            "Every ingestion needs a project_id.",
            "Failed files are retried automatically; set max_retries to change the budget.",
        ],
        "flows": [
            {
                "name": "Preview",
                "steps": ["segment-text({ text })"]
            },
            {
                "name": "Ingest",
                "steps": [
                    "ingest-file({ path, project_id, max_retries? })",
                    "ingest-directory({ path, project_id })",
                    "metrics()"
                ]
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn settings_snapshot_reports_effective_attempts() {
        let snapshot =
            SettingsSnapshot::from(RetryPolicy::new(0).with_base_delay(Duration::from_millis(500)));
        let value: Value = serde_json::from_str(&serialize_json(&snapshot, "mcp://settings"))
            .expect("settings payload must be valid JSON");
        assert_eq!(value["retry"]["max_attempts"], 1);
        assert_eq!(value["retry"]["base_delay_ms"], 500);
    }

    #[test]
    fn usage_payload_lists_ingest_flow() {
        let usage = usage_payload();
        let steps = usage["flows"][1]["steps"].as_array().expect("steps");
        assert!(steps.iter().any(|step| step.as_str().is_some_and(|s| s.starts_with("ingest-file"))));
    }
}
