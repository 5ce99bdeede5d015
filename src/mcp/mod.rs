//! Model Context Protocol (MCP) integration for Rusty Ingest.
//!
//! This module wires the ingestion pipeline into an MCP server so editors and agent hosts can
//! segment text and ingest local files over stdio. The surface area consists of:
//!
//! - Tools: `segment-text`, `ingest-file`, `ingest-directory`, and `metrics`.
//! - Resources: `mcp://usage` and `mcp://settings`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::RustyIngestMcpServer;
