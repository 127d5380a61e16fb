//! Document scanning on top of the bucket index.
//! Splits paragraph text into word tokens and walks them with `match_entry_at`.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::terminology::{PhraseMatch, TerminologyEntry, TerminologyIndex};

/// Characters that separate words in a paragraph.
const DELIMITERS: &str = r#"[\s.,:;?!/\\"'()\[\]{}|*+]+"#;

/// A word with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'t> {
    pub text: &'t str,
    pub start: usize,
    pub end: usize,
}

impl AsRef<str> for Token<'_> {
    fn as_ref(&self) -> &str {
        self.text
    }
}

pub struct Tokenizer {
    delimiters: Regex,
    min_len: usize,
    ignored: HashSet<String>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            delimiters: Regex::new(DELIMITERS).expect("delimiter pattern is valid"),
            min_len: 1,
            ignored: HashSet::new(),
        }
    }

    /// Drop tokens shorter than `min_len` characters.
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Drop these words (case-insensitive).
    pub fn with_ignored<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()));
        self
    }

    /// Every kept token, in order. Filtered words leave gaps; use [`runs`](Self::runs)
    /// when matching phrases.
    pub fn tokenize<'t>(&self, text: &'t str) -> Vec<Token<'t>> {
        self.runs(text).into_iter().flatten().collect()
    }

    /// Kept tokens split into runs of adjacent words. A word dropped by the
    /// length or ignore filter ends the current run, so no phrase spans it.
    pub fn runs<'t>(&self, text: &'t str) -> Vec<Vec<Token<'t>>> {
        let mut runs = Vec::new();
        let mut run = Vec::new();
        let mut last = 0;
        let bounds = self
            .delimiters
            .find_iter(text)
            .map(|d| (d.start(), d.end()))
            .chain(std::iter::once((text.len(), text.len())));

        for (delim_start, delim_end) in bounds {
            let (start, end) = (last, delim_start);
            last = delim_end;
            if start >= end {
                continue;
            }
            let word = &text[start..end];
            if self.keeps(word) {
                run.push(Token { text: word, start, end });
            } else if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
        runs
    }

    fn keeps(&self, word: &str) -> bool {
        if word.chars().count() < self.min_len {
            return false;
        }
        self.ignored.is_empty() || !self.ignored.contains(&word.to_lowercase())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Longest match at every token position. Matches may overlap.
pub fn scan_all<'a, S: AsRef<str>>(index: &'a TerminologyIndex, tokens: &[S]) -> Vec<PhraseMatch<'a>> {
    (0..tokens.len())
        .filter_map(|i| index.match_entry_at(tokens, i))
        .collect()
}

/// Left to right; after a match, scanning resumes after its last token.
pub fn scan_disjoint<'a, S: AsRef<str>>(
    index: &'a TerminologyIndex,
    tokens: &[S],
) -> Vec<PhraseMatch<'a>> {
    let mut matches = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match index.match_entry_at(tokens, i) {
            Some(m) => {
                i = m.end();
                matches.push(m);
            }
            None => i += 1,
        }
    }
    matches
}

/// First match starting at or after `from`.
pub fn find_next<'a, S: AsRef<str>>(
    index: &'a TerminologyIndex,
    tokens: &[S],
    from: usize,
) -> Option<PhraseMatch<'a>> {
    (from..tokens.len()).find_map(|i| index.match_entry_at(tokens, i))
}

/// A match located in the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMatch {
    /// Byte offsets into the scanned text.
    pub start: usize,
    pub end: usize,
    /// The matched text as it appears in the document.
    pub text: String,
    pub entry: TerminologyEntry,
}

/// Tokenize `text` and collect disjoint matches with their byte spans.
/// Each run of adjacent kept words is scanned on its own.
pub fn scan_text(index: &TerminologyIndex, tokenizer: &Tokenizer, text: &str) -> Vec<TextMatch> {
    let mut found = Vec::new();
    for tokens in tokenizer.runs(text) {
        for m in scan_disjoint(index, &tokens) {
            let start = tokens[m.start].start;
            let end = tokens[m.end() - 1].end;
            found.push(TextMatch {
                start,
                end,
                text: text[start..end].to_string(),
                entry: m.entry.clone(),
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminology::normalize_phrase;

    fn index(labels: &[&str]) -> TerminologyIndex {
        TerminologyIndex::build(
            labels
                .iter()
                .enumerate()
                .map(|(i, l)| TerminologyEntry {
                    label: l.to_string(),
                    key_phrase: normalize_phrase(l),
                    description: "d".into(),
                    reference: format!("ref{i}"),
                })
                .collect(),
        )
    }

    fn words<'t>(tokens: &[Token<'t>]) -> Vec<&'t str> {
        tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_delimiters_with_spans() {
        let tokens = Tokenizer::new().tokenize("Het (open) data-model: goed!");
        assert_eq!(words(&tokens), vec!["Het", "open", "data-model", "goed"]);
        assert_eq!((tokens[1].start, tokens[1].end), (5, 9));
    }

    #[test]
    fn empty_and_delimiter_only_text_has_no_tokens() {
        assert!(Tokenizer::new().tokenize("").is_empty());
        assert!(Tokenizer::new().tokenize(" .,;\r\n\t").is_empty());
    }

    #[test]
    fn min_len_and_ignored_words_filter_tokens() {
        let tokenizer = Tokenizer::new().with_min_len(2).with_ignored(["De", "het"]);
        let tokens = tokenizer.tokenize("De a hond en het Adres");
        assert_eq!(words(&tokens), vec!["hond", "en", "Adres"]);
    }

    #[test]
    fn filtered_words_split_runs() {
        let tokenizer = Tokenizer::new().with_min_len(2).with_ignored(["de"]);
        let runs: Vec<Vec<&str>> = tokenizer
            .runs("open a data, open de data en adres")
            .iter()
            .map(|run| words(run))
            .collect();
        assert_eq!(runs, vec![vec!["open"], vec!["data", "open"], vec!["data", "en", "adres"]]);
    }

    #[test]
    fn phrases_never_match_across_filtered_words() {
        let idx = index(&["open data", "adres"]);
        let tokenizer = Tokenizer::new().with_min_len(2).with_ignored(["de"]);

        let text = "Een open a data punt en open de data.";
        assert!(scan_text(&idx, &tokenizer, text).is_empty());

        let text = "De open data en het adres";
        let matches = scan_text(&idx, &tokenizer, text);
        let found: Vec<&str> = matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(found, vec!["open data", "adres"]);
    }

    #[test]
    fn scan_all_reports_every_start_position() {
        let idx = index(&["open data", "data standaard", "open data standaard"]);
        let tokens = ["open", "data", "standaard"];
        let spans: Vec<(usize, usize)> = scan_all(&idx, &tokens).iter().map(|m| (m.start, m.len)).collect();
        assert_eq!(spans, vec![(0, 3), (1, 2)]);
    }

    #[test]
    fn scan_disjoint_skips_past_matches() {
        let idx = index(&["open data", "data standaard", "adres"]);
        let tokens = ["open", "data", "standaard", "adres"];
        let spans: Vec<(usize, usize)> = scan_disjoint(&idx, &tokens).iter().map(|m| (m.start, m.len)).collect();
        assert_eq!(spans, vec![(0, 2), (3, 1)]);
    }

    #[test]
    fn find_next_starts_at_offset() {
        let idx = index(&["adres"]);
        let tokens = ["adres", "en", "adres"];
        assert_eq!(find_next(&idx, &tokens, 0).map(|m| m.start), Some(0));
        assert_eq!(find_next(&idx, &tokens, 1).map(|m| m.start), Some(2));
        assert!(find_next(&idx, &tokens, 3).is_none());
    }

    #[test]
    fn scan_text_maps_back_to_byte_spans() {
        let idx = index(&["Open Data Standaard", "adres"]);
        let text = "De Open Data-Standaard? Zie: open data standaard, of het e-adres.";
        let matches = scan_text(&idx, &Tokenizer::new(), text);
        // "Data-Standaard" is a single token, so the first occurrence does not match.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "open data standaard");
        assert_eq!(&text[matches[0].start..matches[0].end], "open data standaard");
        assert_eq!(matches[0].entry.reference, "ref0");
    }
}
