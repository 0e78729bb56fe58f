use serde::{Deserialize, Serialize};

/// A request to import one reference under a destination prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub reference: String,
    #[serde(default)]
    pub destination_prefix: String,
}

impl ImportRequest {
    pub fn new(reference: impl Into<String>, destination_prefix: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            destination_prefix: destination_prefix.into(),
        }
    }
}

/// Whether the reference named one item or a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Single,
    Collection,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Single => "single",
            ImportKind::Collection => "collection",
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One successfully written object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedItem {
    pub title: String,
    pub key: String,
    pub source_id: String,
    /// Zero when the item was skipped
    pub size_bytes: u64,
    pub content_type: String,
}

/// One per-item failure recorded in the batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,
    pub error: String,
}

/// Aggregated outcome of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub kind: ImportKind,
    pub imported: usize,
    pub skipped: usize,
    pub total_bytes: u64,
    pub items: Vec<ImportedItem>,
    pub errors: Vec<ItemError>,
}

impl ImportResult {
    pub fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            imported: 0,
            skipped: 0,
            total_bytes: 0,
            items: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn record_imported(&mut self, item: ImportedItem) {
        self.imported += 1;
        self.total_bytes += item.size_bytes;
        self.items.push(item);
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_error(&mut self, error: ItemError) {
        self.errors.push(error);
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Every outcome counted so far
    pub fn attempted(&self) -> usize {
        self.imported + self.skipped + self.errors.len()
    }
}
