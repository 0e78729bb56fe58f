pub mod config;
pub mod humanize;
pub mod import;
pub mod observability;
pub mod source;
pub mod storage;
pub mod testing; // Expose for tests (StaticSource, RecordingSink)
