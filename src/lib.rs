#![deny(missing_docs)]

//! Core library for the Rusty Ingest document pipeline.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document, paragraph, and sentence persistence.
pub mod datastore;
/// Text extraction backends.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document processing pipeline.
pub mod processing;
/// File upload backends.
pub mod storage;
mod transport;
