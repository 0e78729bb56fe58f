//! Tracing setup and a progress sink that writes events to the log

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::humanize::{self, ByteSize};
use crate::import::{ProgressEvent, ProgressSink};

/// Install the fmt subscriber, honoring `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Logs every progress event as a structured line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Resolving { destination, .. } => {
                info!(destination, "Resolving reference");
            }
            ProgressEvent::Resolved { kind, total, .. } => {
                info!(%kind, total, "Reference resolved");
            }
            ProgressEvent::Starting { item, .. } => {
                info!(
                    index = item.index,
                    total = item.total,
                    title = %item.title,
                    "Starting item"
                );
            }
            ProgressEvent::Downloading {
                item,
                bytes_read,
                percent,
                speed_bytes_per_sec,
                ..
            } => {
                debug!(
                    title = %item.title,
                    read = %ByteSize(bytes_read),
                    percent = format_args!("{percent:.1}"),
                    speed = %humanize::rate(speed_bytes_per_sec),
                    "Downloading"
                );
            }
            ProgressEvent::Downloaded {
                item,
                destination,
                total_bytes,
                ..
            } => {
                info!(
                    title = %item.title,
                    destination,
                    batch_total = %ByteSize(total_bytes),
                    "Item stored"
                );
            }
            ProgressEvent::Skipped {
                item, destination, ..
            } => {
                info!(title = %item.title, destination, "Item already imported");
            }
            ProgressEvent::Error { item, error } => {
                warn!(title = %item.title, source_id = %item.source_id, error, "Item failed");
            }
            ProgressEvent::Finished {
                imported,
                failed,
                skipped_count,
                total_bytes,
                ..
            } => {
                info!(
                    imported,
                    failed,
                    skipped = skipped_count,
                    size = %ByteSize(total_bytes),
                    "Batch finished"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportKind, ItemRef};

    #[test]
    fn test_log_sink_accepts_every_stage() {
        let sink = LogSink;
        let item = ItemRef::new(ImportKind::Single, 1, 1, "Song", "id");

        sink.emit(ProgressEvent::Starting {
            item: item.clone(),
            message: "Downloading".to_string(),
        });
        sink.emit(ProgressEvent::Downloading {
            item: item.clone(),
            bytes_read: 10,
            total_bytes_expected: None,
            percent: 0.0,
            speed_bytes_per_sec: 0.0,
        });
        sink.emit(ProgressEvent::Error {
            item,
            error: "boom".to_string(),
        });
    }
}
