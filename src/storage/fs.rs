//! Filesystem uploader for local deployments without object storage.

use super::{FileUploader, UploadError, UploadReceipt, object_key};
use crate::processing::{DocumentContext, UploadedFile};
use async_trait::async_trait;
use std::path::PathBuf;

/// Writes uploads beneath a root directory and returns `file://` URLs.
pub struct FsUploader {
    root: PathBuf,
}

impl FsUploader {
    /// Store uploads beneath `root`, creating directories on demand.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileUploader for FsUploader {
    async fn upload(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
    ) -> Result<UploadReceipt, UploadError> {
        let key = object_key(file, context);
        let target = self.root.join(&key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;

        let absolute = match tokio::fs::canonicalize(&target).await {
            Ok(path) => path,
            Err(_) => target,
        };
        tracing::debug!(path = %absolute.display(), bytes = file.size(), "File stored locally");
        Ok(UploadReceipt {
            file_url: format!("file://{}", absolute.display()),
            object_key: key,
        })
    }
}
