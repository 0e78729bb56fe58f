//! Batch orchestration
//!
//! Drives one import request from resolution to the final [`ImportResult`]:
//!
//! ```text
//! resolving -> resolved
//!   -> (starting -> downloading* -> downloaded | skipped | error)*
//!   -> finished
//! ```
//! Items run strictly one after another. A failing item is recorded and the
//! loop moves on; only an empty reference, a fatal resolution error or a
//! cancellation observed between items ends the batch early.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::{ImportError, Result};
use super::events::{ItemRef, ProgressEvent, ProgressSink, emit};
use super::format::{DEFAULT_PREFERRED_FAMILY, select_encoding};
use super::naming::{KeyNamer, normalize_prefix};
use super::progress::{ProgressCallback, ProgressSample};
use super::resolver;
use super::transfer::TransferEngine;
use super::types::{ImportRequest, ImportResult, ImportedItem, ItemError};
use crate::config::ImportConfig;
use crate::humanize::ByteSize;
use crate::source::{MediaSource, ResolvedItem};
use crate::storage::{DestinationStore, UsageRecalculator};

enum ItemOutcome {
    Imported(ImportedItem),
    Skipped(ImportedItem),
}

/// Runs import batches against one source and one destination store
pub struct Importer {
    source: Arc<dyn MediaSource>,
    store: Arc<dyn DestinationStore>,
    usage: Option<Arc<dyn UsageRecalculator>>,
    engine: TransferEngine,
    namer: KeyNamer,
    preferred_family: String,
}

impl Importer {
    pub fn new(source: Arc<dyn MediaSource>, store: Arc<dyn DestinationStore>) -> Self {
        Self {
            engine: TransferEngine::new(source.clone(), store.clone()),
            source,
            store,
            usage: None,
            namer: KeyNamer::default(),
            preferred_family: DEFAULT_PREFERRED_FAMILY.to_string(),
        }
    }

    /// Apply the `[import]` configuration section
    pub fn with_config(mut self, config: &ImportConfig) -> Self {
        self.namer = KeyNamer::new(config.max_title_len, config.fallback_name.clone());
        self.preferred_family = config.preferred_family.clone();
        self.with_sample_interval(Duration::from_millis(config.progress_interval_ms))
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.engine = TransferEngine::new(self.source.clone(), self.store.clone())
            .with_sample_interval(interval);
        self
    }

    /// Recompute storage usage in the background after batches that wrote objects
    pub fn with_usage(mut self, usage: Arc<dyn UsageRecalculator>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub async fn run(
        &self,
        request: &ImportRequest,
        sink: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<ImportResult> {
        let reference = request.reference.trim();
        if reference.is_empty() {
            return Err(ImportError::EmptyReference);
        }

        let prefix = normalize_prefix(&request.destination_prefix);
        info!(reference, prefix = %prefix, "Starting import");

        emit(
            sink,
            ProgressEvent::Resolving {
                message: "Resolving reference".to_string(),
                destination: prefix.clone(),
            },
        );

        let resolution = resolver::resolve(self.source.as_ref(), reference, sink).await?;
        let kind = resolution.kind;
        let total = resolution.items.len();

        let mut result = ImportResult::new(kind);
        for failure in resolution.failures {
            result.record_error(failure);
        }

        emit(
            sink,
            ProgressEvent::Resolved {
                kind,
                total,
                message: format!("Found {total} item(s)"),
                destination: prefix.clone(),
            },
        );

        for (i, item) in resolution.items.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(reference, completed = i, total, "Import cancelled");
                return Err(ImportError::Cancelled);
            }

            let position = ItemRef::new(kind, i + 1, total, &item.title, &item.source_id);
            emit(
                sink,
                ProgressEvent::Starting {
                    item: position.clone(),
                    message: format!("Downloading {:?}", item.title),
                },
            );

            match self.import_item(item, &prefix, &position, sink).await {
                Ok(ItemOutcome::Imported(imported)) => {
                    let destination = imported.key.clone();
                    result.record_imported(imported);
                    emit(
                        sink,
                        ProgressEvent::Downloaded {
                            item: position,
                            message: format!("Downloaded {:?}", item.title),
                            imported: result.imported,
                            failed: result.failed(),
                            total_bytes: result.total_bytes,
                            destination,
                        },
                    );
                }
                Ok(ItemOutcome::Skipped(existing)) => {
                    info!(
                        key = %existing.key,
                        source_id = %item.source_id,
                        "Already imported, skipping"
                    );
                    result.record_skipped();
                    emit(
                        sink,
                        ProgressEvent::Skipped {
                            item: position,
                            message: format!("{:?} already exists, skipping", item.title),
                            destination: existing.key,
                            skipped: true,
                        },
                    );
                }
                Err(e) => {
                    warn!(
                        title = %item.title,
                        source_id = %item.source_id,
                        error = %e,
                        "Failed to import item"
                    );
                    emit(
                        sink,
                        ProgressEvent::Error {
                            item: position,
                            error: e.to_string(),
                        },
                    );
                    result.record_error(ItemError {
                        title: item.title.clone(),
                        source_id: item.source_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if result.imported > 0 {
            self.schedule_usage_recalculation();
        }

        info!(
            kind = %kind,
            imported = result.imported,
            skipped = result.skipped,
            failed = result.failed(),
            total = %ByteSize(result.total_bytes),
            "Import finished"
        );

        emit(
            sink,
            ProgressEvent::Finished {
                kind,
                imported: result.imported,
                failed: result.failed(),
                skipped_count: result.skipped,
                total,
                total_bytes: result.total_bytes,
                message: "Import complete".to_string(),
            },
        );

        Ok(result)
    }

    async fn import_item(
        &self,
        item: &ResolvedItem,
        prefix: &str,
        position: &ItemRef,
        sink: Option<&dyn ProgressSink>,
    ) -> Result<ItemOutcome> {
        let encoding = select_encoding(item, &self.preferred_family)?;
        let placement = self
            .namer
            .plan(self.store.as_ref(), prefix, &item.title, &item.source_id, &encoding)
            .await?;

        if placement.skip {
            let existing = self.engine.transfer(item, &encoding, &placement, None).await?;
            return Ok(ItemOutcome::Skipped(existing));
        }

        let callback = sink.map(|sink| {
            let position = position.clone();
            Box::new(move |sample: ProgressSample| {
                sink.emit(ProgressEvent::Downloading {
                    item: position.clone(),
                    bytes_read: sample.bytes_read,
                    total_bytes_expected: sample.total,
                    percent: sample.percent,
                    speed_bytes_per_sec: sample.speed_bytes_per_sec,
                })
            }) as ProgressCallback<'_>
        });

        let imported = self.engine.transfer(item, &encoding, &placement, callback).await?;
        Ok(ItemOutcome::Imported(imported))
    }

    /// Fire-and-forget; the task outlives the batch and ignores its cancellation
    fn schedule_usage_recalculation(&self) {
        let Some(usage) = self.usage.clone() else {
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = usage.recalculate().await {
                error!(error = %e, "Failed to recalculate storage usage after import");
            }
        });
    }
}
