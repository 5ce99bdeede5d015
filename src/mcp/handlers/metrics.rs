//! Handler for the metrics tool.

use std::sync::Arc;

use crate::processing::{IngestionApi, IngestionService};
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::to_json;

/// Handle the `metrics` tool, returning the current ingestion counters.
pub(crate) async fn handle_metrics(
    processing: &Arc<IngestionService>,
) -> Result<CallToolResult, McpError> {
    let snapshot = processing.metrics_snapshot();
    Ok(CallToolResult::structured(to_json(&snapshot)?))
}
