//! Storage engine for uploaded files.

use crate::asset::AssetService;
use crate::error::{ErrorKind, Result};
use iconvault_storage::ByteStream;
use std::sync::Arc;
use tracing::instrument;

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub size: u64,
    pub etag: Option<String>,
}

/// Places uploaded files under a fixed destination directory.
pub struct UploadEngine {
    assets: Arc<AssetService>,
    destination: String,
}
impl UploadEngine {
    pub fn new(assets: Arc<AssetService>, destination: impl Into<String>) -> Self {
        Self {
            assets,
            destination: destination.into(),
        }
    }

    /// Storage key for `original_name`, which must be a single path segment.
    fn path(&self, original_name: &str) -> Result<String> {
        let separated = original_name.contains(['/', '\\', '\0']);
        if separated || matches!(original_name, "" | "." | "..") {
            exn::bail!(ErrorKind::InvalidArgument(format!("not a plain file name: {original_name:?}")));
        }
        Ok(match self.destination.trim_end_matches('/') {
            "" => original_name.to_string(),
            destination => format!("{destination}/{original_name}"),
        })
    }

    /// Store an uploaded file as is, under its original name.
    #[instrument(skip(self, content))]
    pub async fn handle_file(&self, original_name: &str, content: ByteStream) -> Result<StoredFile> {
        let info = self.assets.store(content, &self.path(original_name)?).await?;
        Ok(StoredFile {
            path: info.name,
            size: info.size,
            etag: info.etag,
        })
    }

    /// Remove a previously uploaded file.
    #[instrument(skip(self))]
    pub async fn remove_file(&self, original_name: &str) -> Result<bool> {
        self.assets.remove(&self.path(original_name)?).await
    }
}
