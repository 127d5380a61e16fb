//! Interactive search queries.
//! A leading `=` asks for exact matching; anything else is a contains search.

use serde::Serialize;

use super::TerminologyEntry;

/// Parsed search box input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub phrase: String,
    pub exact: bool,
}

impl SearchQuery {
    /// None when there is nothing to search for.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (phrase, exact) = match input.strip_prefix('=') {
            Some(rest) => (rest.trim(), true),
            None => (input, false),
        };
        if phrase.is_empty() {
            return None;
        }
        Some(Self {
            phrase: phrase.to_lowercase(),
            exact,
        })
    }

    pub fn exact(phrase: &str) -> Self {
        Self {
            phrase: phrase.trim().to_lowercase(),
            exact: true,
        }
    }

    pub fn contains(phrase: &str) -> Self {
        Self {
            phrase: phrase.trim().to_lowercase(),
            exact: false,
        }
    }
}

/// Hits of a search, truncated to the configured maximum.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub hits: Vec<TerminologyEntry>,
    /// Number of matching entries before truncation.
    pub total: usize,
}

impl SearchResults {
    pub fn new(all: &[TerminologyEntry], max_results: usize) -> Self {
        Self {
            hits: all.iter().take(max_results).cloned().collect(),
            total: all.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.hits.len() < self.total
    }
}
