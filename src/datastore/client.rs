//! HTTP client for a PostgREST-compatible datastore.

use crate::config::Config;
use crate::datastore::{
    DocumentStore,
    types::{
        DatastoreError, DocumentMetadata, DocumentRecord, NewDocument, NewParagraph, NewSentence,
        ParagraphRecord, SentenceRecord,
    },
};
use crate::transport::{build_client, format_endpoint, normalize_base_url, read_failure};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};

const DOCUMENTS_TABLE: &str = "documents";
const PARAGRAPHS_TABLE: &str = "paragraphs";
const SENTENCES_TABLE: &str = "sentences";

/// Lightweight REST client writing rows through `POST /rest/v1/{table}`.
pub struct RestStore {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl RestStore {
    /// Construct a client for the given base URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, DatastoreError> {
        let client = build_client()?;
        let base_url = normalize_base_url(base_url).map_err(DatastoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized datastore HTTP client"
        );
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, DatastoreError> {
        Self::new(&config.datastore_url, config.datastore_api_key.clone())
    }

    async fn insert_rows<T, R>(&self, table: &'static str, rows: &T) -> Result<Vec<R>, DatastoreError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, &format!("rest/v1/{table}"))
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            let error = match failure.message {
                Some(message) => DatastoreError::Rejected(message),
                None => DatastoreError::UnexpectedStatus {
                    status: failure.status,
                    body: failure.body,
                },
            };
            tracing::error!(table, error = %error, "Datastore insert failed");
            return Err(error);
        }

        let inserted: Vec<R> = response.json().await?;
        tracing::debug!(table, rows = inserted.len(), "Rows inserted");
        Ok(inserted)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("apikey", api_key).bearer_auth(api_key);
        }
        req
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn create_document(
        &self,
        metadata: &DocumentMetadata,
        file_url: &str,
        extracted_text: &str,
    ) -> Result<DocumentRecord, DatastoreError> {
        let row = NewDocument::new(metadata, file_url, extracted_text);
        let created: Vec<DocumentRecord> = self.insert_rows(DOCUMENTS_TABLE, &[row]).await?;
        created
            .into_iter()
            .next()
            .ok_or(DatastoreError::EmptyResponse {
                table: DOCUMENTS_TABLE,
            })
    }

    async fn insert_paragraphs(
        &self,
        records: Vec<NewParagraph>,
    ) -> Result<Vec<ParagraphRecord>, DatastoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_rows(PARAGRAPHS_TABLE, &records).await
    }

    async fn insert_sentences(
        &self,
        records: Vec<NewSentence>,
    ) -> Result<Vec<SentenceRecord>, DatastoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_rows(SENTENCES_TABLE, &records).await
    }
}
