//! Terminology dictionary: entries, dataset loading, the first-word bucket index,
//! dataset sources and the published store.

pub mod cache;
pub mod dataset;
pub mod index;
pub mod query;
pub mod source;
pub mod store;

use serde::{Deserialize, Serialize};

/// A single dictionary entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologyEntry {
    /// Original display label (may be empty).
    pub label: String,
    /// Lowercased, trimmed label with single-space separators. Never empty.
    pub key_phrase: String,
    /// Never empty.
    pub description: String,
    pub reference: String,
}

impl TerminologyEntry {
    /// Plain note text for a host to insert as a footnote or endnote.
    pub fn note_text(&self) -> String {
        format!("{}\n[{}]", self.description, self.reference)
    }
}

/// Which record field populates `reference`. Varies per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdField {
    #[default]
    Id,
    Context,
}

impl IdField {
    pub fn as_str(self) -> &'static str {
        match self {
            IdField::Id => "id",
            IdField::Context => "context",
        }
    }
}

impl std::fmt::Display for IdField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IdField {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(IdField::Id),
            "context" => Ok(IdField::Context),
            other => Err(DatasetError::UnknownIdField(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum DatasetError {
    /// The top-level document is not a JSON object.
    Malformed(String),
    Parse(serde_json::Error),
    UnknownIdField(String),
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Malformed(msg) => write!(f, "malformed dataset: {msg}"),
            DatasetError::Parse(e) => write!(f, "dataset parse error: {e}"),
            DatasetError::UnknownIdField(s) => {
                write!(f, "unknown id field `{s}` (expected `id` or `context`)")
            }
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(e: serde_json::Error) -> Self {
        DatasetError::Parse(e)
    }
}

/// Lowercase, trim and collapse whitespace runs to single spaces.
pub fn normalize_phrase(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    for word in lower.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

pub use dataset::load;
pub use index::{BucketEntry, IndexStats, PhraseMatch, TerminologyIndex};
pub use query::{SearchQuery, SearchResults};
pub use source::{DatasetSource, FileSource, HttpSource, InlineSource, SourceError, SourceSpec};
pub use store::{InitOutcome, Snapshot, TerminologyStore};
