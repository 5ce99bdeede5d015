//! Handler for the `segment-text` tool.

use crate::processing::segment_document;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use super::{parse_arguments, to_json};

/// Request payload accepted by the `segment-text` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct SegmentToolRequest {
    /// Raw text to segment.
    pub(crate) text: String,
}

/// Handle `segment-text` by returning the paragraph/sentence tree without storing it.
pub(crate) async fn handle_segment(
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: SegmentToolRequest = parse_arguments(arguments)?;
    let parsed = segment_document(&args.text)
        .map_err(|err| McpError::internal_error(err.to_string(), None))?;
    Ok(CallToolResult::structured(to_json(&parsed)?))
}
