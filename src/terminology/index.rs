//! First-word bucket index.
//! Maps the first word of each key phrase to the phrases starting with it, longest first,
//! so a token scan only compares against a handful of candidates per position.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use super::{normalize_phrase, TerminologyEntry};

/// A key phrase inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub key_phrase: String,
    pub word_count: usize,
    /// Position of the source entry in the canonical list.
    pub entry: usize,
}

/// A phrase matched at a token position.
#[derive(Debug, Clone, Copy)]
pub struct PhraseMatch<'a> {
    pub start: usize,
    /// Number of tokens covered.
    pub len: usize,
    pub entry: &'a TerminologyEntry,
}

impl PhraseMatch<'_> {
    /// Index one past the last matched token.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub buckets: usize,
    pub largest_bucket: usize,
    pub longest_phrase_words: usize,
}

/// Canonical entry list plus the bucket map built over it. Immutable once built.
#[derive(Debug, Default)]
pub struct TerminologyIndex {
    entries: Vec<TerminologyEntry>,
    buckets: HashMap<String, Vec<BucketEntry>>,
}

impl TerminologyIndex {
    /// Build the bucket map. `entries` is expected in canonical order.
    pub fn build(entries: Vec<TerminologyEntry>) -> Self {
        let mut buckets: HashMap<String, Vec<BucketEntry>> = HashMap::new();

        for (pos, entry) in entries.iter().enumerate() {
            let words: Vec<&str> = entry.key_phrase.split(' ').collect();
            buckets
                .entry(words[0].to_string())
                .or_default()
                .push(BucketEntry {
                    key_phrase: entry.key_phrase.clone(),
                    word_count: words.len(),
                    entry: pos,
                });
        }

        // Longest phrase first; stable, so equal lengths keep canonical order.
        for bucket in buckets.values_mut() {
            if bucket.len() > 1 {
                bucket.sort_by(|a, b| b.word_count.cmp(&a.word_count));
            }
        }

        debug!(
            entries = entries.len(),
            buckets = buckets.len(),
            "terminology index built"
        );

        Self { entries, buckets }
    }

    /// Canonical entry list.
    pub fn entries(&self) -> &[TerminologyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket for `first_word` (exact lowercase), longest phrase first.
    pub fn bucket(&self, first_word: &str) -> &[BucketEntry] {
        self.buckets
            .get(first_word)
            .map(|b| b.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over all `(first word, bucket)` pairs.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[BucketEntry])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entries: self.entries.len(),
            buckets: self.buckets.len(),
            largest_bucket: self.buckets.values().map(Vec::len).max().unwrap_or(0),
            longest_phrase_words: self
                .buckets
                .values()
                .filter_map(|b| b.first())
                .map(|e| e.word_count)
                .max()
                .unwrap_or(0),
        }
    }

    /// Interactive phrase search over the full list (O(n), not bucket accelerated).
    ///
    /// `exact` requires equality with the key phrase; otherwise the phrase may occur
    /// anywhere inside it. An empty phrase yields no results. Results keep canonical order.
    pub fn lookup(&self, phrase: &str, exact: bool) -> Vec<&TerminologyEntry> {
        let phrase = phrase.trim().to_lowercase();
        if phrase.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|e| {
                if exact {
                    e.key_phrase == phrase
                } else {
                    e.key_phrase.contains(phrase.as_str())
                }
            })
            .collect()
    }

    /// Exact lookup with whitespace collapsed the same way key phrases are.
    pub fn entries_for(&self, phrase: &str) -> Vec<&TerminologyEntry> {
        self.lookup(&normalize_phrase(phrase), true)
    }

    /// Length in tokens of the longest key phrase starting at `tokens[start]`.
    pub fn match_at<S: AsRef<str>>(&self, tokens: &[S], start: usize) -> Option<usize> {
        self.match_bucket_at(tokens, start).map(|b| b.word_count)
    }

    /// Like [`match_at`](Self::match_at), resolving the winning phrase to its entry.
    pub fn match_entry_at<S: AsRef<str>>(
        &self,
        tokens: &[S],
        start: usize,
    ) -> Option<PhraseMatch<'_>> {
        self.match_bucket_at(tokens, start).map(|b| PhraseMatch {
            start,
            len: b.word_count,
            entry: &self.entries[b.entry],
        })
    }

    fn match_bucket_at<S: AsRef<str>>(&self, tokens: &[S], start: usize) -> Option<&BucketEntry> {
        let word = tokens.get(start)?.as_ref().to_lowercase();
        let bucket = self.buckets.get(&word)?;
        let remaining = tokens.len() - start;

        let mut phrase = String::new();
        for candidate in bucket {
            let k = candidate.word_count;
            if k > remaining {
                continue;
            }

            phrase.clear();
            for (j, token) in tokens[start..start + k].iter().enumerate() {
                if j > 0 {
                    phrase.push(' ');
                }
                phrase.push_str(token.as_ref());
            }
            let joined = phrase.to_lowercase();

            trace!(words = k, phrase = %joined, key = %candidate.key_phrase, "bucket candidate");
            if joined == candidate.key_phrase {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, reference: &str) -> TerminologyEntry {
        TerminologyEntry {
            label: label.to_string(),
            key_phrase: normalize_phrase(label),
            description: format!("Description of {label}."),
            reference: reference.to_string(),
        }
    }

    fn index(labels: &[&str]) -> TerminologyIndex {
        TerminologyIndex::build(
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| entry(l, &format!("ref{i}")))
                .collect(),
        )
    }

    #[test]
    fn every_entry_lands_in_exactly_one_bucket() {
        let idx = index(&["open data", "open data standaard", "adres", "e-adres", "open"]);
        let total: usize = idx.buckets().map(|(_, b)| b.len()).sum();
        assert_eq!(total, idx.len());
        for (pos, e) in idx.entries().iter().enumerate() {
            let first = e.key_phrase.split(' ').next().unwrap();
            let hits = idx
                .buckets()
                .flat_map(|(_, b)| b.iter())
                .filter(|b| b.entry == pos)
                .count();
            assert_eq!(hits, 1);
            assert!(idx.bucket(first).iter().any(|b| b.entry == pos));
        }
        assert_eq!(idx.bucket_count(), 3);
    }

    #[test]
    fn buckets_are_longest_first() {
        let idx = index(&["open", "open data", "open data standaard"]);
        let counts: Vec<usize> = idx.bucket("open").iter().map(|b| b.word_count).collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn longest_match_wins() {
        let idx = index(&["open data", "open data standaard"]);
        let tokens = ["open", "data", "standaard", "is", "goed"];
        assert_eq!(idx.match_at(&tokens, 0), Some(3));
    }

    #[test]
    fn shorter_phrase_matches_when_longer_does_not() {
        let idx = index(&["open data", "open data standaard"]);
        let tokens = ["Open", "Data", "portaal"];
        assert_eq!(idx.match_at(&tokens, 0), Some(2));
    }

    #[test]
    fn candidates_longer_than_remaining_tokens_are_skipped() {
        let idx = index(&["open data standaard"]);
        assert_eq!(idx.match_at(&["open", "data"], 0), None);
    }

    #[test]
    fn no_bucket_means_no_match() {
        let idx = index(&["open data"]);
        let tokens = ["de", "hond", "loopt"];
        assert_eq!(idx.match_at(&tokens, 0), None);
    }

    #[test]
    fn out_of_range_start_is_no_match() {
        let idx = index(&["open data"]);
        assert_eq!(idx.match_at(&["open", "data"], 2), None);
        assert_eq!(idx.match_at::<&str>(&[], 0), None);
    }

    #[test]
    fn match_is_case_insensitive() {
        let idx = index(&["Open Data"]);
        let m = idx.match_entry_at(&["x", "OPEN", "data"], 1).unwrap();
        assert_eq!((m.start, m.len, m.end()), (1, 2, 3));
        assert_eq!(m.entry.label, "Open Data");
    }

    #[test]
    fn partial_words_do_not_match() {
        let idx = index(&["open data"]);
        assert_eq!(idx.match_at(&["open", "database"], 0), None);
        assert_eq!(idx.match_at(&["opendata"], 0), None);
    }

    #[test]
    fn exact_and_contains_lookup() {
        let idx = index(&["adres", "e-adres", "perceel"]);
        let exact: Vec<&str> = idx
            .lookup("adres", true)
            .iter()
            .map(|e| e.key_phrase.as_str())
            .collect();
        assert_eq!(exact, vec!["adres"]);

        let contains: Vec<&str> = idx
            .lookup("  ADRES ", false)
            .iter()
            .map(|e| e.key_phrase.as_str())
            .collect();
        assert_eq!(contains, vec!["adres", "e-adres"]);
    }

    #[test]
    fn exact_lookup_returns_duplicates() {
        let idx = index(&["adres", "adres"]);
        assert_eq!(idx.lookup("adres", true).len(), 2);
        assert_eq!(idx.entries_for("  Adres "), idx.lookup("adres", true));
    }

    #[test]
    fn empty_phrase_returns_nothing() {
        let idx = index(&["adres"]);
        assert!(idx.lookup("", false).is_empty());
        assert!(idx.lookup("   ", true).is_empty());
    }

    #[test]
    fn stats_report_sizes() {
        let idx = index(&["open", "open data standaard", "adres"]);
        let stats = idx.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.buckets, 2);
        assert_eq!(stats.largest_bucket, 2);
        assert_eq!(stats.longest_phrase_words, 3);
    }

    #[test]
    fn empty_index_is_harmless() {
        let idx = TerminologyIndex::default();
        assert!(idx.is_empty());
        assert!(idx.lookup("x", false).is_empty());
        assert_eq!(idx.match_at(&["x"], 0), None);
    }
}
