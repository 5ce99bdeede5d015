//! Remote extraction service client (`POST {base}/extract`, multipart `file`).

use super::{ExtractedText, ExtractionError, TextExtractor};
use crate::processing::UploadedFile;
use crate::transport::{build_client, format_endpoint, normalize_base_url, read_failure};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};

/// Client for an extraction service handling PDFs, office documents, and images.
pub struct HttpExtractor {
    client: Client,
    base_url: String,
}

impl HttpExtractor {
    /// Construct a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ExtractionError> {
        let client = build_client()?;
        let base_url = normalize_base_url(base_url).map_err(ExtractionError::InvalidUrl)?;
        tracing::debug!(url = %base_url, "Initialized extraction HTTP client");
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl TextExtractor for HttpExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.file_type())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(format_endpoint(&self.base_url, "extract"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = read_failure(response).await;
            return Err(match failure.message {
                Some(message) => ExtractionError::Rejected(message),
                None => ExtractionError::UnexpectedStatus {
                    status: failure.status,
                    body: failure.body,
                },
            });
        }

        let extracted: ExtractedText = response.json().await?;
        if extracted.text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        tracing::debug!(
            file = %file.file_name,
            method = %extracted.method,
            chars = extracted.text.chars().count(),
            "Remote extraction finished"
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn pdf() -> UploadedFile {
        UploadedFile::new("scan.pdf", None, b"%PDF-1.7 fake".to_vec())
    }

    #[tokio::test]
    async fn posts_file_and_reads_text_and_method() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/extract")
                    .body_contains("filename=\"scan.pdf\"");
                then.status(200)
                    .json_body(json!({ "text": "Recovered text.", "method": "ocr" }));
            })
            .await;

        let extractor = HttpExtractor::new(&server.base_url()).unwrap();
        let extracted = extractor.extract(&pdf()).await.expect("extracted");

        mock.assert();
        assert_eq!(extracted.text, "Recovered text.");
        assert_eq!(extracted.method, "ocr");
    }

    #[tokio::test]
    async fn blank_text_is_reported_as_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/extract");
                then.status(200).json_body(json!({ "text": "  ", "method": "pdf" }));
            })
            .await;

        let extractor = HttpExtractor::new(&server.base_url()).unwrap();
        let error = extractor.extract(&pdf()).await.unwrap_err();
        assert!(matches!(error, ExtractionError::Empty));
    }

    #[tokio::test]
    async fn service_error_message_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/extract");
                then.status(422).json_body(json!({ "error": "Encrypted PDF" }));
            })
            .await;

        let extractor = HttpExtractor::new(&server.base_url()).unwrap();
        let error = extractor.extract(&pdf()).await.unwrap_err();
        assert_eq!(error.to_string(), "Encrypted PDF");
    }
}
