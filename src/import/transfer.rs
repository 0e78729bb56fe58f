//! Single-item stream-to-store copy

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::error::Result;
use super::naming::{Placement, identity_metadata};
use super::progress::{DEFAULT_SAMPLE_INTERVAL, ProgressCallback, ProgressReader};
use super::types::ImportedItem;
use crate::humanize::ByteSize;
use crate::source::{Encoding, MediaSource, ResolvedItem};
use crate::storage::DestinationStore;

pub struct TransferEngine {
    source: Arc<dyn MediaSource>,
    store: Arc<dyn DestinationStore>,
    sample_interval: Duration,
}

impl TransferEngine {
    pub fn new(source: Arc<dyn MediaSource>, store: Arc<dyn DestinationStore>) -> Self {
        Self {
            source,
            store,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Copy one item into the store under the planned key.
    ///
    /// A skipped placement returns immediately with `size_bytes == 0` and no
    /// stream is opened. The source stream is owned by this call and released
    /// on every return path.
    pub async fn transfer(
        &self,
        item: &ResolvedItem,
        encoding: &Encoding,
        placement: &Placement,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<ImportedItem> {
        if placement.skip {
            return Ok(ImportedItem {
                title: item.title.clone(),
                key: placement.key.clone(),
                source_id: item.source_id.clone(),
                size_bytes: 0,
                content_type: placement.content_type.clone(),
            });
        }

        let stream = self.source.open_stream(item, encoding).await?;

        let declared = match encoding.declared_byte_length {
            0 => stream.declared_length.unwrap_or(0),
            len => len,
        };
        debug!(
            key = %placement.key,
            declared = %ByteSize(declared),
            "Stream opened"
        );

        let mut reader = ProgressReader::new(stream.reader, Some(declared), on_progress)
            .with_interval(self.sample_interval);

        let metadata = identity_metadata(&item.source_id, &item.title);
        self.store
            .put(&placement.key, &mut reader, &placement.content_type, &metadata)
            .await?;

        let mut size = reader.bytes_read();
        if size == 0 && declared > 0 {
            size = declared;
        }

        info!(
            key = %placement.key,
            source_id = %item.source_id,
            size = %ByteSize(size),
            "Item transferred"
        );

        Ok(ImportedItem {
            title: item.title.clone(),
            key: placement.key.clone(),
            source_id: item.source_id.clone(),
            size_bytes: size,
            content_type: placement.content_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Collection, MemberRef, SourceError, SourceStream};
    use crate::storage::StorageClient;
    use crate::testing::StaticSource;
    use async_trait::async_trait;

    /// Serves an empty body while claiming `declared` bytes
    struct UnmeteredSource {
        declared: u64,
    }

    #[async_trait]
    impl MediaSource for UnmeteredSource {
        async fn resolve_collection(&self, _reference: &str) -> crate::source::Result<Collection> {
            Err(SourceError::NotACollection)
        }

        async fn resolve_single(&self, reference: &str) -> crate::source::Result<ResolvedItem> {
            Err(SourceError::Unavailable(reference.to_string()))
        }

        async fn materialize(&self, member: &MemberRef) -> crate::source::Result<ResolvedItem> {
            Err(SourceError::Unavailable(member.locator.clone()))
        }

        async fn open_stream(
            &self,
            _item: &ResolvedItem,
            _encoding: &Encoding,
        ) -> crate::source::Result<SourceStream> {
            Ok(SourceStream {
                reader: Box::new(std::io::Cursor::new(Vec::new())),
                declared_length: Some(self.declared),
            })
        }
    }

    fn item(encoding: &Encoding) -> ResolvedItem {
        ResolvedItem {
            source_id: "clip-1".to_string(),
            title: "Clip".to_string(),
            locator: "clip-1".to_string(),
            encodings: vec![encoding.clone()],
        }
    }

    fn encoding(declared: u64) -> Encoding {
        Encoding {
            mime_type: "audio/mp4".to_string(),
            has_audio: true,
            quality_rank: 128,
            declared_byte_length: declared,
        }
    }

    fn placement(key: &str, skip: bool) -> Placement {
        Placement {
            key: key.to_string(),
            skip,
            content_type: "audio/mp4".to_string(),
        }
    }

    #[tokio::test]
    async fn test_size_falls_back_to_stream_length() {
        let engine = TransferEngine::new(
            Arc::new(UnmeteredSource { declared: 4242 }),
            Arc::new(StorageClient::in_memory()),
        );
        let encoding = encoding(0);

        let imported = engine
            .transfer(&item(&encoding), &encoding, &placement("Clip.m4a", false), None)
            .await
            .unwrap();

        assert_eq!(imported.size_bytes, 4242);
        assert_eq!(imported.key, "Clip.m4a");
    }

    #[tokio::test]
    async fn test_encoding_length_wins_over_stream_length() {
        let engine = TransferEngine::new(
            Arc::new(UnmeteredSource { declared: 4242 }),
            Arc::new(StorageClient::in_memory()),
        );
        let encoding = encoding(1000);

        let imported = engine
            .transfer(&item(&encoding), &encoding, &placement("Clip.m4a", false), None)
            .await
            .unwrap();

        assert_eq!(imported.size_bytes, 1000);
    }

    #[tokio::test]
    async fn test_counted_bytes_are_reported() {
        let source = Arc::new(StaticSource::new().with_item("song", "Song", vec![5u8; 64]));
        let storage = Arc::new(StorageClient::in_memory());
        let engine = TransferEngine::new(source.clone(), storage.clone());
        let item = source.resolve_single("song").await.unwrap();

        let imported = engine
            .transfer(&item, &item.encodings[0], &placement("Song.m4a", false), None)
            .await
            .unwrap();

        assert_eq!(imported.size_bytes, 64);
        assert_eq!(storage.download("Song.m4a").await.unwrap(), vec![5u8; 64]);
        let head = storage.head("Song.m4a").await.unwrap();
        assert_eq!(head.metadata.get("importbox-source-id").unwrap(), "song");
    }

    #[tokio::test]
    async fn test_skipped_placement_opens_no_stream() {
        let source = Arc::new(StaticSource::new().with_item("song", "Song", b"data".to_vec()));
        let storage = Arc::new(StorageClient::in_memory());
        let engine = TransferEngine::new(source.clone(), storage.clone());
        let item = source.resolve_single("song").await.unwrap();

        let existing = engine
            .transfer(&item, &item.encodings[0], &placement("Song.m4a", true), None)
            .await
            .unwrap();

        assert_eq!(existing.size_bytes, 0);
        assert_eq!(existing.key, "Song.m4a");
        assert_eq!(source.opened_streams(), 0);
        assert!(storage.head("Song.m4a").await.is_err());
    }
}
