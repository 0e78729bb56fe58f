//! Remote media import
//!
//! An [`Importer`] turns one reference into objects in a destination store:
//! the reference is resolved into items, each item gets one audio-bearing
//! encoding and a collision-free key, and the bytes are streamed into the
//! store while [`ProgressEvent`]s describe what is happening.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use importbox::import::{ImportRequest, Importer};
//! use importbox::source::http::{HttpConfig, HttpSource};
//! use importbox::storage::StorageClient;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(HttpSource::new(HttpConfig::default())?);
//! let store = Arc::new(StorageClient::in_memory());
//! let importer = Importer::new(source, store);
//!
//! let request = ImportRequest::new("https://example.com/show.m3u", "podcasts");
//! let result = importer.run(&request, None, &CancellationToken::new()).await?;
//! println!("imported {} item(s)", result.imported);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod events;
pub mod format;
pub mod naming;
mod orchestrator;
pub mod progress;
pub mod resolver;
pub mod transfer;
pub mod types;

pub use error::{ImportError, Result};
pub use events::{ItemRef, ProgressEvent, ProgressSink};
pub use format::select_encoding;
pub use naming::{KeyNamer, Placement};
pub use orchestrator::Importer;
pub use progress::{ProgressReader, ProgressSample};
pub use resolver::Resolution;
pub use transfer::TransferEngine;
pub use types::{ImportKind, ImportRequest, ImportResult, ImportedItem, ItemError};
