//! MCP server entrypoint (stdio transport).
//!
//! Launches an MCP server that exposes Rusty Ingest's tools and resources over stdio. This mode
//! is designed for editor/agent integrations and shares all runtime configuration with the HTTP
//! binary.
use anyhow::{Context, Result};
use rmcp::{service::ServiceExt, transport::stdio};
use rustyingest::{config, logging, mcp::RustyIngestMcpServer, processing};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let config = config::init_config().context("failed to load configuration")?;

    let processing = Arc::new(
        processing::IngestionService::from_config(config)
            .context("failed to initialize ingestion service")?,
    );
    let server = RustyIngestMcpServer::new(processing);

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    Ok(())
}
