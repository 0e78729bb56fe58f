//! Progress events emitted while a batch runs
//!
//! Events are transient: they are handed to an optional [`ProgressSink`] on the
//! batch's own flow of control and never stored. Serialized form is JSON with a
//! `stage` discriminant so HTTP adapters can relay them verbatim.

use serde::Serialize;

use super::types::ImportKind;

/// Position and identity of the item an event refers to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRef {
    pub kind: ImportKind,
    /// 1-based position; absent for collection members that failed to resolve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub title: String,
    pub source_id: String,
}

impl ItemRef {
    pub fn new(
        kind: ImportKind,
        index: usize,
        total: usize,
        title: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            index: Some(index),
            total: Some(total),
            title: title.into(),
            source_id: source_id.into(),
        }
    }

    /// Reference to an item that never got a position in the batch
    pub fn unpositioned(
        kind: ImportKind,
        title: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            index: None,
            total: None,
            title: title.into(),
            source_id: source_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    Resolving {
        message: String,
        destination: String,
    },
    Resolved {
        kind: ImportKind,
        total: usize,
        message: String,
        destination: String,
    },
    Starting {
        #[serde(flatten)]
        item: ItemRef,
        message: String,
    },
    Downloading {
        #[serde(flatten)]
        item: ItemRef,
        bytes_read: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes_expected: Option<u64>,
        percent: f64,
        speed_bytes_per_sec: f64,
    },
    Downloaded {
        #[serde(flatten)]
        item: ItemRef,
        message: String,
        imported: usize,
        failed: usize,
        total_bytes: u64,
        destination: String,
    },
    Skipped {
        #[serde(flatten)]
        item: ItemRef,
        message: String,
        destination: String,
        skipped: bool,
    },
    Error {
        #[serde(flatten)]
        item: ItemRef,
        error: String,
    },
    Finished {
        kind: ImportKind,
        imported: usize,
        failed: usize,
        skipped_count: usize,
        total: usize,
        total_bytes: u64,
        message: String,
    },
}

impl ProgressEvent {
    /// Stage name as it appears on the wire
    pub fn stage(&self) -> &'static str {
        match self {
            ProgressEvent::Resolving { .. } => "resolving",
            ProgressEvent::Resolved { .. } => "resolved",
            ProgressEvent::Starting { .. } => "starting",
            ProgressEvent::Downloading { .. } => "downloading",
            ProgressEvent::Downloaded { .. } => "downloaded",
            ProgressEvent::Skipped { .. } => "skipped",
            ProgressEvent::Error { .. } => "error",
            ProgressEvent::Finished { .. } => "finished",
        }
    }
}

/// Observer for batch progress.
///
/// Invoked synchronously from the single flow that runs the batch, never
/// concurrently. Any `Fn(ProgressEvent)` closure is a sink.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forward to the sink when one is registered
pub(crate) fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        sink.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_downloading_event_json_shape() {
        let event = ProgressEvent::Downloading {
            item: ItemRef::new(ImportKind::Collection, 2, 3, "Song", "abc"),
            bytes_read: 500,
            total_bytes_expected: Some(1000),
            percent: 50.0,
            speed_bytes_per_sec: 250.0,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "downloading");
        assert_eq!(json["kind"], "collection");
        assert_eq!(json["index"], 2);
        assert_eq!(json["sourceId"], "abc");
        assert_eq!(json["bytesRead"], 500);
        assert_eq!(json["totalBytesExpected"], 1000);
        assert_eq!(json["speedBytesPerSec"], 250.0);
    }

    #[test]
    fn test_unpositioned_error_omits_index() {
        let event = ProgressEvent::Error {
            item: ItemRef::unpositioned(ImportKind::Collection, "Broken", "xyz"),
            error: "unavailable".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "error");
        assert!(json.get("index").is_none());
        assert!(json.get("total").is_none());
        assert_eq!(json["error"], "unavailable");
    }

    #[test]
    fn test_closure_sink_and_absent_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |event: ProgressEvent| seen.lock().unwrap().push(event.stage());

        emit(
            Some(&sink),
            ProgressEvent::Resolving {
                message: "Resolving".to_string(),
                destination: String::new(),
            },
        );
        emit(
            None,
            ProgressEvent::Resolving {
                message: "ignored".to_string(),
                destination: String::new(),
            },
        );

        assert_eq!(*seen.lock().unwrap(), vec!["resolving"]);
    }
}
