//! Reference resolution into importable items

use tracing::{debug, warn};

use super::error::{ImportError, Result};
use super::events::{ItemRef, ProgressEvent, ProgressSink, emit};
use super::types::{ImportKind, ItemError};
use crate::source::{MediaSource, ResolvedItem, SourceError};

/// Items to import plus the collection members that failed to resolve
#[derive(Debug, Clone)]
pub struct Resolution {
    pub kind: ImportKind,
    pub items: Vec<ResolvedItem>,
    pub failures: Vec<ItemError>,
}

/// Resolve `reference` as a collection, falling back to a single item.
///
/// Only [`SourceError::NotACollection`] triggers the fallback; any other error
/// is fatal. Collection members are materialized in declared order and a
/// failing member is recorded (and reported as an `error` event) rather than
/// failing the whole resolution.
pub async fn resolve(
    source: &dyn MediaSource,
    reference: &str,
    sink: Option<&dyn ProgressSink>,
) -> Result<Resolution> {
    let collection = match source.resolve_collection(reference).await {
        Ok(collection) => collection,
        Err(SourceError::NotACollection) => {
            let item = source
                .resolve_single(reference)
                .await
                .map_err(|e| ImportError::Resolution {
                    what: "item",
                    source: e,
                })?;

            return Ok(Resolution {
                kind: ImportKind::Single,
                items: vec![item],
                failures: Vec::new(),
            });
        }
        Err(e) => {
            return Err(ImportError::Resolution {
                what: "collection",
                source: e,
            });
        }
    };

    let members = source.enumerate_members(&collection).await;
    debug!(collection = %collection.title, members = members.len(), "Resolved collection");

    let mut items = Vec::with_capacity(members.len());
    let mut failures = Vec::new();

    for member in &members {
        match source.materialize(member).await {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!(
                    source_id = %member.source_id,
                    title = %member.title,
                    error = %e,
                    "Failed to load collection entry"
                );
                emit(
                    sink,
                    ProgressEvent::Error {
                        item: ItemRef::unpositioned(
                            ImportKind::Collection,
                            &member.title,
                            &member.source_id,
                        ),
                        error: e.to_string(),
                    },
                );
                failures.push(ItemError {
                    title: member.title.clone(),
                    source_id: member.source_id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Resolution {
        kind: ImportKind::Collection,
        items,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSink, StaticSource};

    #[tokio::test]
    async fn test_single_item_fallback() {
        let source = StaticSource::new().with_item("song", "Song", b"data".to_vec());

        let resolution = resolve(&source, "song", None).await.unwrap();

        assert_eq!(resolution.kind, ImportKind::Single);
        assert_eq!(resolution.items.len(), 1);
        assert_eq!(resolution.items[0].title, "Song");
        assert!(resolution.failures.is_empty());
    }

    #[tokio::test]
    async fn test_collection_member_failure_is_recorded() {
        let source = StaticSource::new()
            .with_item("a", "First", b"1".to_vec())
            .with_item("b", "Second", b"2".to_vec())
            .with_item("c", "Third", b"3".to_vec())
            .with_collection("list", &["a", "b", "c"])
            .fail_materialize("b");
        let sink = RecordingSink::new();

        let resolution = resolve(&source, "list", Some(&sink)).await.unwrap();

        assert_eq!(resolution.kind, ImportKind::Collection);
        let titles: Vec<&str> = resolution.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
        assert_eq!(resolution.failures.len(), 1);
        assert_eq!(resolution.failures[0].title, "Second");
        assert_eq!(sink.stages(), vec!["error"]);
    }

    #[tokio::test]
    async fn test_other_collection_errors_are_fatal() {
        let source = StaticSource::new().fail_resolution("broken");

        let err = resolve(&source, "broken", None).await.unwrap_err();

        assert!(matches!(err, ImportError::Resolution { what: "collection", .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_unknown_single_item_is_fatal() {
        let source = StaticSource::new();

        let err = resolve(&source, "missing", None).await.unwrap_err();

        assert!(matches!(err, ImportError::Resolution { what: "item", .. }));
    }
}
