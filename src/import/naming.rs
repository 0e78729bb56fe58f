//! Destination key derivation and already-imported detection.
//!
//! Every item has two candidate keys under the batch prefix: the primary key
//! built from the sanitized title, and the legacy key which appends the source
//! id. Objects written by this crate carry the source id as identity metadata,
//! which is what makes re-imports no-ops.

use tracing::debug;

use super::error::Result;
use crate::source::Encoding;
use crate::storage::{DestinationStore, Metadata, ObjectMetadata, StoreError};

pub const SOURCE_ID_METADATA_KEY: &str = "importbox-source-id";
pub const SOURCE_TITLE_METADATA_KEY: &str = "importbox-source-title";

pub const DEFAULT_MAX_TITLE_LEN: usize = 80;
pub const DEFAULT_FALLBACK_NAME: &str = "imported-media";

/// Where an item goes, and whether it is already there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub key: String,
    pub skip: bool,
    pub content_type: String,
}

/// Both candidate keys for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKeys {
    pub primary: String,
    pub legacy: String,
}

/// Collapse a user prefix into `a/b/` form, or the empty string
pub fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        return String::new();
    }
    format!("{}/", segments.join("/"))
}

/// Keep `[A-Za-z0-9._ -]`, then join whitespace-separated words with `-`
pub fn sanitize_file_name(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ' '))
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let mime_type = mime_type.to_ascii_lowercase();
    if mime_type.contains("audio/mp4") {
        ".m4a"
    } else if mime_type.contains("mp4") {
        ".mp4"
    } else if mime_type.contains("webm") {
        ".webm"
    } else if mime_type.contains("audio/mpeg") || mime_type.contains("mp3") {
        ".mp3"
    } else if mime_type.contains("ogg") {
        ".ogg"
    } else {
        ".bin"
    }
}

/// Mime type without parameters, e.g. `video/mp4; codecs="avc1"` -> `video/mp4`
pub fn content_type_for_mime(mime_type: &str) -> String {
    match mime_type.trim().parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_string(),
        Err(_) => mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
    }
}

/// Whether stored metadata ties an object to `source_id`
pub fn matches_identity(metadata: &Metadata, source_id: &str) -> bool {
    if source_id.is_empty() {
        return false;
    }
    metadata
        .iter()
        .any(|(key, value)| key.eq_ignore_ascii_case(SOURCE_ID_METADATA_KEY) && value == source_id)
}

/// Metadata written with every imported object
pub fn identity_metadata(source_id: &str, title: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_ID_METADATA_KEY.to_string(), source_id.to_string());
    if !title.is_empty() {
        metadata.insert(SOURCE_TITLE_METADATA_KEY.to_string(), title.to_string());
    }
    metadata
}

/// Builds keys and runs the idempotency check against the store
#[derive(Debug, Clone)]
pub struct KeyNamer {
    max_title_len: usize,
    fallback_name: String,
}

impl Default for KeyNamer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TITLE_LEN, DEFAULT_FALLBACK_NAME)
    }
}

impl KeyNamer {
    pub fn new(max_title_len: usize, fallback_name: impl Into<String>) -> Self {
        Self {
            max_title_len,
            fallback_name: fallback_name.into(),
        }
    }

    pub fn base_name(&self, title: &str) -> String {
        let mut name = sanitize_file_name(title);
        if name.is_empty() {
            name = self.fallback_name.clone();
        }
        name.chars().take(self.max_title_len).collect()
    }

    pub fn candidate_keys(
        &self,
        prefix: &str,
        title: &str,
        source_id: &str,
        encoding: &Encoding,
    ) -> CandidateKeys {
        let base = self.base_name(title);
        let extension = extension_for_mime(&encoding.mime_type);

        CandidateKeys {
            primary: format!("{prefix}{base}{extension}"),
            legacy: format!("{prefix}{base}-{source_id}{extension}"),
        }
    }

    /// Decide the destination key for an item.
    ///
    /// 1. primary key tagged with this source id: already imported, skip
    /// 2. legacy key exists at all: already imported, skip
    /// 3. primary key holds unrelated content: write to the legacy key
    /// 4. otherwise write to the primary key
    pub async fn plan(
        &self,
        store: &dyn DestinationStore,
        prefix: &str,
        title: &str,
        source_id: &str,
        encoding: &Encoding,
    ) -> Result<Placement> {
        let keys = self.candidate_keys(prefix, title, source_id, encoding);
        let content_type = content_type_for_mime(&encoding.mime_type);

        let primary = head_if_exists(store, &keys.primary).await?;
        if let Some(existing) = &primary {
            if matches_identity(&existing.metadata, source_id) {
                debug!(key = %keys.primary, source_id, "Already imported under primary key");
                return Ok(Placement {
                    key: keys.primary,
                    skip: true,
                    content_type,
                });
            }
        }

        if head_if_exists(store, &keys.legacy).await?.is_some() {
            debug!(key = %keys.legacy, source_id, "Already imported under legacy key");
            return Ok(Placement {
                key: keys.legacy,
                skip: true,
                content_type,
            });
        }

        let key = if primary.is_some() {
            debug!(key = %keys.primary, source_id, "Primary key taken by unrelated object");
            keys.legacy
        } else {
            keys.primary
        };

        Ok(Placement {
            key,
            skip: false,
            content_type,
        })
    }
}

async fn head_if_exists(store: &dyn DestinationStore, key: &str) -> Result<Option<ObjectMetadata>> {
    match store.head(key).await {
        Ok(meta) => Ok(Some(meta)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
