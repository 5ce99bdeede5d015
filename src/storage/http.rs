//! Object-storage uploader speaking the `/object/{bucket}/{key}` REST convention.

use super::{FileUploader, UploadError, UploadReceipt, object_key};
use crate::processing::{DocumentContext, UploadedFile};
use crate::transport::{build_client, format_endpoint, normalize_base_url, read_failure};
use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};

/// Uploads files to an HTTP object store and returns their public URL.
pub struct HttpUploader {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: Option<String>,
}

impl HttpUploader {
    /// Construct an uploader for `bucket` at `base_url`.
    pub fn new(base_url: &str, bucket: &str, api_key: Option<String>) -> Result<Self, UploadError> {
        let client = build_client()?;
        let base_url = normalize_base_url(base_url).map_err(UploadError::InvalidUrl)?;
        tracing::debug!(url = %base_url, bucket, "Initialized storage HTTP client");
        Ok(Self {
            client,
            base_url,
            bucket: bucket.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl FileUploader for HttpUploader {
    async fn upload(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
    ) -> Result<UploadReceipt, UploadError> {
        let key = object_key(file, context);
        let url = format_endpoint(&self.base_url, &format!("object/{}/{key}", self.bucket));

        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, file.file_type())
            .header("x-upsert", "true")
            .body(file.bytes.clone());
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let failure = read_failure(response).await;
            let error = match failure.message {
                Some(message) => UploadError::Rejected(message),
                None => UploadError::UnexpectedStatus {
                    status: failure.status,
                    body: failure.body,
                },
            };
            tracing::error!(key = %key, error = %error, "Upload failed");
            return Err(error);
        }

        let file_url = format_endpoint(
            &self.base_url,
            &format!("object/public/{}/{key}", self.bucket),
        );
        tracing::debug!(key = %key, bytes = file.size(), "File uploaded");
        Ok(UploadReceipt {
            file_url,
            object_key: key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    #[tokio::test]
    async fn upload_posts_bytes_and_returns_public_url() {
        let server = MockServer::start_async().await;
        let file = UploadedFile::new("notes.txt", None, b"Hello world.".to_vec());
        let context = DocumentContext::new("proj");
        let key = object_key(&file, &context);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("/object/documents/{key}"))
                    .header("content-type", "text/plain")
                    .header("authorization", "Bearer secret")
                    .body("Hello world.");
                then.status(200).json_body(json!({ "Key": "documents/notes.txt" }));
            })
            .await;

        let uploader =
            HttpUploader::new(&server.base_url(), "documents", Some("secret".into())).unwrap();
        let receipt = uploader.upload(&file, &context).await.expect("uploaded");

        mock.assert();
        assert_eq!(receipt.object_key, key);
        assert_eq!(
            receipt.file_url,
            format!("{}/object/public/documents/{key}", server.base_url())
        );
    }

    #[tokio::test]
    async fn storage_error_message_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400).json_body(json!({
                    "statusCode": "404",
                    "error": "Bucket not found"
                }));
            })
            .await;

        let uploader = HttpUploader::new(&server.base_url(), "missing", None).unwrap();
        let error = uploader
            .upload(
                &UploadedFile::new("a.txt", None, b"x".to_vec()),
                &DocumentContext::new("p"),
            )
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "Bucket not found");
    }

    #[tokio::test]
    async fn bare_status_failure_keeps_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let uploader = HttpUploader::new(&server.base_url(), "documents", None).unwrap();
        let error = uploader
            .upload(
                &UploadedFile::new("a.txt", None, b"x".to_vec()),
                &DocumentContext::new("p"),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, UploadError::UnexpectedStatus { .. }));
        assert!(error.to_string().contains("upstream unavailable"));
    }
}
