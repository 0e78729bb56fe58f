//! Aggregate storage usage recomputation

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::path::Path as StoragePath;
use serde::Serialize;

use super::{Result, SIDECAR_SUFFIX, StorageClient};
use crate::humanize::ByteSize;

/// Totals produced by a usage scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub object_count: u64,
    pub total_bytes: u64,
}

/// Recomputes bookkeeping after a batch wrote new objects
#[async_trait]
pub trait UsageRecalculator: Send + Sync {
    async fn recalculate(&self) -> Result<UsageReport>;
}

/// Lists the bucket and sums object sizes, ignoring metadata sidecars
#[derive(Clone)]
pub struct StorageUsage {
    storage: StorageClient,
    prefix: Option<StoragePath>,
}

impl StorageUsage {
    pub fn new(storage: StorageClient) -> Self {
        Self {
            storage,
            prefix: None,
        }
    }

    /// Restrict the scan to keys under `prefix`
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        self.prefix = (!trimmed.is_empty()).then(|| StoragePath::from(trimmed));
        self
    }
}

#[async_trait]
impl UsageRecalculator for StorageUsage {
    async fn recalculate(&self) -> Result<UsageReport> {
        let store = self.storage.object_store();
        let mut listing = store.list(self.prefix.as_ref());
        let mut report = UsageReport::default();

        while let Some(meta) = listing.try_next().await? {
            if meta.location.as_ref().ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            report.object_count += 1;
            report.total_bytes += meta.size;
        }

        tracing::info!(
            bucket = %self.storage.bucket,
            objects = report.object_count,
            total = %ByteSize(report.total_bytes),
            "Recalculated storage usage"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DestinationStore, Metadata, MetadataMode};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_usage_sums_objects() {
        let storage = StorageClient::in_memory();
        let metadata = Metadata::new();

        let mut first: &[u8] = &[0u8; 100];
        let mut second: &[u8] = &[0u8; 50];
        storage.put("media/one.mp4", &mut first, "video/mp4", &metadata).await.unwrap();
        storage.put("other/two.mp4", &mut second, "video/mp4", &metadata).await.unwrap();

        let report = StorageUsage::new(storage.clone()).recalculate().await.unwrap();
        assert_eq!(report, UsageReport { object_count: 2, total_bytes: 150 });

        let scoped = StorageUsage::new(storage).with_prefix("/media/").recalculate().await.unwrap();
        assert_eq!(scoped, UsageReport { object_count: 1, total_bytes: 100 });
    }

    #[tokio::test]
    async fn test_usage_skips_sidecars() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let local = object_store::local::LocalFileSystem::new_with_prefix(temp_dir.path()).unwrap();
        let storage =
            StorageClient::new(Arc::new(local), "local".to_string(), MetadataMode::Sidecar);

        let mut body: &[u8] = &[1u8; 64];
        let metadata: Metadata = [("importbox-source-id".to_string(), "x".to_string())].into();
        storage.put("a.m4a", &mut body, "audio/mp4", &metadata).await.unwrap();

        let report = StorageUsage::new(storage).recalculate().await.unwrap();
        assert_eq!(report, UsageReport { object_count: 1, total_bytes: 64 });
    }
}
