//! JSON schema builders for MCP tools.

use serde_json::{Map, Value};

/// Build the schema describing the `segment-text` tool input.
pub(crate) fn segment_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "text".into(),
        string_schema("Raw text to split into paragraphs and sentences"),
    );
    finalize_object_schema(properties, &["text"])
}

/// Build the schema describing the `ingest-file` tool input.
pub(crate) fn ingest_file_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "path".into(),
        string_schema("Path of the file to ingest, readable by the server"),
    );
    properties.insert(
        "project_id".into(),
        string_schema("Project the document belongs to"),
    );

    let mut retries_schema = Map::new();
    retries_schema.insert("type".into(), Value::String("integer".into()));
    retries_schema.insert(
        "description".into(),
        Value::String("Attempts before giving up (defaults to INGEST_MAX_RETRIES)".into()),
    );
    retries_schema.insert("minimum".into(), Value::Number(1.into()));
    properties.insert("max_retries".into(), Value::Object(retries_schema));

    finalize_object_schema(properties, &["path", "project_id"])
}

/// Build the schema describing the `ingest-directory` tool input.
pub(crate) fn ingest_directory_input_schema() -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "path".into(),
        string_schema("Directory walked recursively; hidden entries are skipped"),
    );
    properties.insert(
        "project_id".into(),
        string_schema("Project every document belongs to"),
    );
    finalize_object_schema(properties, &["path", "project_id"])
}

/// Schema representing an empty object (used for parameterless tools).
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
