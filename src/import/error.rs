use thiserror::Error;

use crate::source::SourceError;
use crate::storage::StoreError;

/// Errors raised by the import pipeline.
///
/// `EmptyReference`, `Resolution` and `Cancelled` abort a batch; the rest are
/// recorded against a single item and the batch carries on.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("reference is required")]
    EmptyReference,

    #[error("failed to resolve {what}: {source}")]
    Resolution {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("import cancelled")]
    Cancelled,

    #[error("no downloadable formats with audio were found")]
    NoPlayableFormat,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Whether this error ends the whole batch rather than one item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::EmptyReference | ImportError::Resolution { .. } | ImportError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
