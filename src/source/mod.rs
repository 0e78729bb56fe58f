//! Remote media source abstraction
//!
//! A [`MediaSource`] turns a user-supplied reference into importable items and
//! opens byte streams for a chosen [`Encoding`]. The import pipeline only talks
//! to this trait; [`http::HttpSource`] is the bundled implementation.

pub mod http;
mod m3u;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The reference is valid but does not name a collection
    #[error("reference is not a collection")]
    NotACollection,

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("item unavailable: {0}")]
    Unavailable(String),

    #[error("stream failed: {0}")]
    StreamFailed(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// One transferable variant of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub mime_type: String,
    pub has_audio: bool,
    pub quality_rank: u32,
    /// Zero when the source does not declare a length
    pub declared_byte_length: u64,
}

/// An importable unit produced by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub source_id: String,
    pub title: String,
    /// Source-specific address used when opening streams
    pub locator: String,
    pub encodings: Vec<Encoding>,
}

/// Reference to one collection member, materialized lazily
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub source_id: String,
    pub title: String,
    pub locator: String,
}

/// A resolved collection handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub title: String,
    pub members: Vec<MemberRef>,
}

/// Open byte stream for one encoding
pub struct SourceStream {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub declared_length: Option<u64>,
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("declared_length", &self.declared_length)
            .finish_non_exhaustive()
    }
}

/// Capability for resolving references and opening media streams
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Interpret the reference as a collection.
    ///
    /// Must fail with [`SourceError::NotACollection`] when the reference is a
    /// single item, so the caller can fall back to [`MediaSource::resolve_single`].
    async fn resolve_collection(&self, reference: &str) -> Result<Collection>;

    async fn resolve_single(&self, reference: &str) -> Result<ResolvedItem>;

    /// Members in the collection's declared order
    async fn enumerate_members(&self, collection: &Collection) -> Vec<MemberRef> {
        collection.members.clone()
    }

    async fn materialize(&self, member: &MemberRef) -> Result<ResolvedItem>;

    async fn open_stream(&self, item: &ResolvedItem, encoding: &Encoding) -> Result<SourceStream>;
}
