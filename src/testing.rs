//! In-memory collaborators for tests and local experiments

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::import::{ProgressEvent, ProgressSink};
use crate::source::{
    Collection, Encoding, MediaSource, MemberRef, ResolvedItem, Result, SourceError, SourceStream,
};

/// A [`MediaSource`] serving fixed items and bodies from memory.
///
/// Items are addressed by id; the id doubles as the reference, the source id
/// and the locator.
#[derive(Debug, Default)]
pub struct StaticSource {
    items: HashMap<String, ResolvedItem>,
    bodies: HashMap<String, Vec<u8>>,
    collections: HashMap<String, Collection>,
    failing_references: HashSet<String>,
    failing_members: HashSet<String>,
    failing_streams: HashSet<String>,
    opened: AtomicUsize,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item with one `audio/mp4` encoding declaring the body length
    pub fn with_item(self, id: &str, title: &str, body: Vec<u8>) -> Self {
        let encoding = Encoding {
            mime_type: "audio/mp4".to_string(),
            has_audio: true,
            quality_rank: 128,
            declared_byte_length: body.len() as u64,
        };
        self.with_encodings(id, title, vec![encoding], body)
    }

    pub fn with_encodings(
        mut self,
        id: &str,
        title: &str,
        encodings: Vec<Encoding>,
        body: Vec<u8>,
    ) -> Self {
        self.items.insert(
            id.to_string(),
            ResolvedItem {
                source_id: id.to_string(),
                title: title.to_string(),
                locator: id.to_string(),
                encodings,
            },
        );
        self.bodies.insert(id.to_string(), body);
        self
    }

    /// Register a collection of previously added item ids
    pub fn with_collection(mut self, reference: &str, member_ids: &[&str]) -> Self {
        let members = member_ids
            .iter()
            .map(|id| MemberRef {
                source_id: id.to_string(),
                title: self
                    .items
                    .get(*id)
                    .map(|item| item.title.clone())
                    .unwrap_or_default(),
                locator: id.to_string(),
            })
            .collect();

        self.collections.insert(
            reference.to_string(),
            Collection {
                title: reference.to_string(),
                members,
            },
        );
        self
    }

    pub fn fail_resolution(mut self, reference: &str) -> Self {
        self.failing_references.insert(reference.to_string());
        self
    }

    pub fn fail_materialize(mut self, id: &str) -> Self {
        self.failing_members.insert(id.to_string());
        self
    }

    pub fn fail_stream(mut self, id: &str) -> Self {
        self.failing_streams.insert(id.to_string());
        self
    }

    /// Number of streams opened so far
    pub fn opened_streams(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for StaticSource {
    async fn resolve_collection(&self, reference: &str) -> Result<Collection> {
        if self.failing_references.contains(reference) {
            return Err(SourceError::RequestFailed(format!("{reference} is unreachable")));
        }
        self.collections
            .get(reference)
            .cloned()
            .ok_or(SourceError::NotACollection)
    }

    async fn resolve_single(&self, reference: &str) -> Result<ResolvedItem> {
        self.items
            .get(reference)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(reference.to_string()))
    }

    async fn materialize(&self, member: &MemberRef) -> Result<ResolvedItem> {
        if self.failing_members.contains(&member.locator) {
            return Err(SourceError::Unavailable(format!("{} is private", member.locator)));
        }
        self.resolve_single(&member.locator).await
    }

    async fn open_stream(&self, item: &ResolvedItem, _encoding: &Encoding) -> Result<SourceStream> {
        if self.failing_streams.contains(&item.locator) {
            return Err(SourceError::StreamFailed(format!(
                "{} refused the connection",
                item.locator
            )));
        }

        let body = self
            .bodies
            .get(&item.locator)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(item.locator.clone()))?;

        self.opened.fetch_add(1, Ordering::SeqCst);

        Ok(SourceStream {
            declared_length: Some(body.len() as u64),
            reader: Box::new(std::io::Cursor::new(body)),
        })
    }
}

/// A [`ProgressSink`] that keeps every event
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<&'static str> {
        self.events().iter().map(ProgressEvent::stage).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
