use std::{env, sync::Once};

use rustyingest::{
    config,
    datastore::{DocumentMetadata, DocumentStore, RestStore},
    processing::{
        DocumentContext, IngestionApi, IngestionService, UploadedFile, persist_parsed_document,
        segment_document,
    },
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() -> &'static config::Config {
    INIT.call_once(|| {
        set_default_env("DATASTORE_URL", "http://127.0.0.1:54321");
        set_default_env("STORAGE_DIR", "target/live-uploads");
        config::init_config().expect("live configuration");
    });
    config::get_config()
}

#[tokio::test]
#[ignore = "Requires live PostgREST datastore"]
async fn live_datastore_persists_structure() {
    let config = init_config_once();
    let store = RestStore::from_config(config).expect("datastore client");
    let metadata = DocumentMetadata {
        title: "live-validation".into(),
        project_id: "live-validation".into(),
        file_type: "text/plain".into(),
        file_size: 42,
    };
    let text = "Live check one. Live check two.\n\nSecond paragraph.";
    let document = store
        .create_document(&metadata, "file:///live-validation.txt", text)
        .await
        .expect("document row");

    let parsed = segment_document(text).expect("segment");
    let stored = persist_parsed_document(&store, &document.id, &parsed)
        .await
        .expect("persist structure");
    assert_eq!(stored.paragraphs.len(), 2);
    assert_eq!(stored.sentences.len(), 3);
}

#[tokio::test]
#[ignore = "Requires live PostgREST datastore"]
async fn live_service_ingests_text_file() {
    let config = init_config_once();
    let service = IngestionService::from_config(config).expect("service");
    let report = service
        .ingest(
            UploadedFile::new("live.txt", None, b"Live ingest works. Really.".to_vec()),
            DocumentContext::new("live-validation"),
            Some(1),
        )
        .await;
    assert!(report.success, "ingest failed: {:?}", report.error);
    assert_eq!(report.sentences.len(), 2);
}
