//! MCP server bootstrap and request dispatch.

use std::{borrow::Cow, sync::Arc};

use crate::{
    mcp::{
        format::{SettingsSnapshot, json_resource_contents, serialize_json, usage_payload},
        handlers::{
            ingest::{handle_ingest_directory, handle_ingest_file},
            metrics::handle_metrics,
            segment::handle_segment,
        },
        registry, schemas,
    },
    processing::{IngestionApi, IngestionService},
};
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, ListResourcesResult, ListToolsResult,
        RawResource, ReadResourceRequestParam, ReadResourceResult, Resource, ServerCapabilities,
        ServerInfo, Tool, ToolAnnotations,
    },
};

const SETTINGS_URI: &str = "mcp://settings";
const USAGE_URI: &str = "mcp://usage";

/// MCP server implementation exposing Rusty Ingest operations.
#[derive(Clone)]
pub struct RustyIngestMcpServer {
    processing: Arc<IngestionService>,
    registry: Arc<registry::Registry>,
}

impl RustyIngestMcpServer {
    /// Create a new MCP server using the supplied ingestion service.
    pub fn new(processing: Arc<IngestionService>) -> Self {
        let mut registry = registry::Registry::default();
        registry.register_resource(SETTINGS_URI, resource_settings);
        registry.register_resource(USAGE_URI, resource_usage);

        registry.register_tool("segment-text", tool_segment_text);
        registry.register_tool("ingest-file", tool_ingest_file);
        registry.register_tool("ingest-directory", tool_ingest_directory);
        registry.register_tool("metrics", tool_metrics);

        Self {
            processing,
            registry: Arc::new(registry),
        }
    }

    fn describe_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("segment-text"),
                title: Some("Segment Text".to_string()),
                description: Some(Cow::Borrowed(
                    "Preview how text splits into paragraphs and sentences; nothing is stored.",
                )),
                input_schema: Arc::new(schemas::segment_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Segment Text")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("ingest-file"),
                title: Some("Ingest File".to_string()),
                description: Some(Cow::Borrowed(
                    "Upload a local file, extract its text, and store it as paragraphs and sentences under a project.",
                )),
                input_schema: Arc::new(schemas::ingest_file_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Ingest File")
                        .destructive(false)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("ingest-directory"),
                title: Some("Ingest Directory".to_string()),
                description: Some(Cow::Borrowed(
                    "Ingest every file under a directory one at a time and report batch statistics.",
                )),
                input_schema: Arc::new(schemas::ingest_directory_input_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Ingest Directory")
                        .destructive(false)
                        .idempotent(false)
                        .open_world(true),
                ),
                icons: None,
            },
            Tool {
                name: Cow::Borrowed("metrics"),
                title: Some("Metrics Snapshot".to_string()),
                description: Some(Cow::Borrowed(
                    "Check ingestion volume, failures, and retries at a glance.",
                )),
                input_schema: Arc::new(schemas::empty_object_schema()),
                output_schema: None,
                annotations: Some(
                    ToolAnnotations::with_title("Metrics Snapshot")
                        .read_only(true)
                        .idempotent(true)
                        .open_world(false),
                ),
                icons: None,
            },
        ]
    }

    fn describe_resources(&self) -> Vec<Resource> {
        let mut settings = RawResource::new(SETTINGS_URI, "settings");
        settings.description = Some("Effective retry schedule for file ingestion".into());

        let mut usage = RawResource::new(USAGE_URI, "usage");
        usage.description = Some(
            "Recommended tool flow: segment-text to preview, ingest-file or ingest-directory to store."
                .into(),
        );

        vec![settings.no_annotation(), usage.no_annotation()]
    }
}

fn resource_settings(
    server: &RustyIngestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    let payload = SettingsSnapshot::from(server.processing.retry_policy());
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                SETTINGS_URI,
                serialize_json(&payload, SETTINGS_URI),
            )],
        })
    })
}

fn resource_usage(
    _server: &RustyIngestMcpServer,
    _request: ReadResourceRequestParam,
) -> registry::ResourceFuture {
    Box::pin(async move {
        Ok(ReadResourceResult {
            contents: vec![json_resource_contents(
                USAGE_URI,
                serialize_json(&usage_payload(), USAGE_URI),
            )],
        })
    })
}

fn tool_segment_text(
    _server: &RustyIngestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    Box::pin(async move { handle_segment(request.arguments).await })
}

fn tool_ingest_file(
    server: &RustyIngestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_ingest_file(&processing, request.arguments).await })
}

fn tool_ingest_directory(
    server: &RustyIngestMcpServer,
    request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_ingest_directory(&processing, request.arguments).await })
}

fn tool_metrics(
    server: &RustyIngestMcpServer,
    _request: CallToolRequestParam,
) -> registry::ToolFuture {
    let processing = server.processing.clone();
    Box::pin(async move { handle_metrics(&processing).await })
}

impl ServerHandler for RustyIngestMcpServer {
    fn get_info(&self) -> ServerInfo {
        let mut implementation = rmcp::model::Implementation::from_build_env();
        implementation.name = "rusty-ingest".to_string();
        implementation.title = Some("Rusty Ingest MCP".to_string());
        implementation.version = env!("CARGO_PKG_VERSION").to_string();

        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: implementation,
            instructions: Some(
                "Use this server to turn documents into stored paragraphs and sentences. Preview segmentation with segment-text, then ingest local files or directories under a project_id.".into(),
            ),
            ..ServerInfo::default()
        }
    }

    fn list_resources(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        let resources = self.describe_resources();
        std::future::ready(Ok(ListResourcesResult::with_all_items(resources)))
    }

    fn list_tools(
        &self,
        _request: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = self.describe_tools();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.resources.get(request.uri.as_str()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            if let Some(handler) = self.registry.tools.get(request.name.as_ref()) {
                return handler(self, request).await;
            }

            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }
}
