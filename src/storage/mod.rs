//! Destination object storage
//! Uses Apache Arrow object_store crate

pub mod usage;

use async_trait::async_trait;
use object_store::buffered::BufWriter;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, path::Path as StoragePath,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};

pub use usage::{StorageUsage, UsageRecalculator, UsageReport};

/// Suffix of the JSON object holding metadata for backends without attributes
pub const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(object_store::Error),
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            other => StoreError::ObjectStoreError(other),
        }
    }
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StoreError>;

/// User metadata stored alongside an object
pub type Metadata = BTreeMap<String, String>;

/// Object description returned by [`DestinationStore::head`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

/// Capability for writing imported media
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Describe the object at `key`, failing with [`StoreError::NotFound`] when absent
    async fn head(&self, key: &str) -> Result<ObjectMetadata>;

    /// Stream `reader` into `key` with the given content type and metadata
    async fn put(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
        metadata: &Metadata,
    ) -> Result<()>;
}

/// How user metadata is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataMode {
    /// Native object attributes (S3, in-memory)
    Attributes,
    /// JSON sidecar object next to each upload (local filesystem)
    Sidecar,
}

/// Storage client wrapping object_store
#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
    mode: MetadataMode,
    pub bucket: String,
}

impl StorageClient {
    /// Create new storage client with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String, mode: MetadataMode) -> Self {
        Self { store, mode, bucket }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(object_store::memory::InMemory::new()),
            mode: MetadataMode::Attributes,
            bucket: "importbox-local".to_string(),
        }
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn metadata_mode(&self) -> MetadataMode {
        self.mode
    }

    /// Read the full object body
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = StoragePath::from(key);

        let result = self.store.get(&path).await?;
        let bytes = result.bytes().await?;

        tracing::debug!(key, size = bytes.len(), "Downloaded from storage");

        Ok(bytes.to_vec())
    }

    async fn read_sidecar(&self, key: &str) -> Result<Metadata> {
        let path = StoragePath::from(sidecar_key(key));
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(Metadata::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_sidecar(&self, key: &str, metadata: &Metadata) -> Result<()> {
        let path = StoragePath::from(sidecar_key(key));
        let body = serde_json::to_vec(metadata)?;
        self.store.put(&path, body.into()).await?;
        Ok(())
    }
}

fn sidecar_key(key: &str) -> String {
    format!("{key}{SIDECAR_SUFFIX}")
}

fn to_attributes(content_type: &str, metadata: &Metadata) -> Attributes {
    let mut attributes = Attributes::new();
    if !content_type.is_empty() {
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
    }
    for (name, value) in metadata {
        attributes.insert(
            Attribute::Metadata(name.clone().into()),
            AttributeValue::from(value.clone()),
        );
    }
    attributes
}

#[async_trait]
impl DestinationStore for StorageClient {
    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        let path = StoragePath::from(key);
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result = self.store.get_opts(&path, options).await?;

        let mut object = ObjectMetadata {
            size: result.meta.size,
            ..Default::default()
        };

        for (attribute, value) in result.attributes.iter() {
            match attribute {
                Attribute::ContentType => object.content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    object.metadata.insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }

        if self.mode == MetadataMode::Sidecar {
            object.metadata.extend(self.read_sidecar(key).await?);
        }

        Ok(object)
    }

    async fn put(
        &self,
        key: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
        content_type: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let path = StoragePath::from(key);

        let mut writer = BufWriter::new(self.store.clone(), path);
        if self.mode == MetadataMode::Attributes {
            writer = writer.with_attributes(to_attributes(content_type, metadata));
        }

        let copied = match tokio::io::copy(reader, &mut writer).await {
            Ok(copied) => copied,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(key, error = %abort_err, "Failed to abort upload");
                }
                return Err(StoreError::UploadFailed(e.to_string()));
            }
        };

        writer
            .shutdown()
            .await
            .map_err(|e| StoreError::UploadFailed(e.to_string()))?;

        // An object without its sidecar would look like unrelated content
        if self.mode == MetadataMode::Sidecar {
            if let Err(e) = self.write_sidecar(key, metadata).await {
                if let Err(delete_err) = self.store.delete(&StoragePath::from(key)).await {
                    tracing::warn!(
                        key,
                        error = %delete_err,
                        "Failed to remove object after sidecar failure"
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(key, size = copied, content_type, "Uploaded to storage");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> Metadata {
        [
            ("importbox-source-id".to_string(), "abc123".to_string()),
            ("importbox-source-title".to_string(), "Some Title".to_string()),
        ]
        .into()
    }

    #[tokio::test]
    async fn test_put_and_head_with_attributes() {
        let storage = StorageClient::in_memory();
        let mut body: &[u8] = b"hello media";

        storage
            .put("media/a.m4a", &mut body, "audio/mp4", &sample_metadata())
            .await
            .unwrap();

        let head = storage.head("media/a.m4a").await.unwrap();
        assert_eq!(head.size, 11);
        assert_eq!(head.content_type.as_deref(), Some("audio/mp4"));
        assert_eq!(head.metadata.get("importbox-source-id").unwrap(), "abc123");

        let bytes = storage.download("media/a.m4a").await.unwrap();
        assert_eq!(bytes, b"hello media");
    }

    #[tokio::test]
    async fn test_head_missing_is_not_found() {
        let storage = StorageClient::in_memory();
        let result = storage.head("missing.mp4").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_sidecar_mode_round_trips_metadata() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let local =
            object_store::local::LocalFileSystem::new_with_prefix(temp_dir.path()).unwrap();
        let storage =
            StorageClient::new(Arc::new(local), "local".to_string(), MetadataMode::Sidecar);
        let mut body: &[u8] = b"0123456789";

        storage
            .put("media/b.mp4", &mut body, "video/mp4", &sample_metadata())
            .await
            .unwrap();

        let head = storage.head("media/b.mp4").await.unwrap();
        assert_eq!(head.size, 10);
        assert_eq!(head.metadata.get("importbox-source-title").unwrap(), "Some Title");

        let sidecar = storage.download("media/b.mp4.meta.json").await.unwrap();
        let parsed: Metadata = serde_json::from_slice(&sidecar).unwrap();
        assert_eq!(parsed, sample_metadata());
    }

    #[tokio::test]
    async fn test_sidecar_failure_removes_object() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        // a non-empty directory where the sidecar file should go
        let blocker = temp_dir.path().join("media").join("c.mp4.meta.json");
        std::fs::create_dir_all(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let local =
            object_store::local::LocalFileSystem::new_with_prefix(temp_dir.path()).unwrap();
        let storage =
            StorageClient::new(Arc::new(local), "local".to_string(), MetadataMode::Sidecar);
        let mut body: &[u8] = b"0123456789";

        let result = storage
            .put("media/c.mp4", &mut body, "video/mp4", &sample_metadata())
            .await;

        assert!(result.is_err());
        assert!(matches!(
            storage.head("media/c.mp4").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(!temp_dir.path().join("media").join("c.mp4").exists());
    }
}
