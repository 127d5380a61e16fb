//! Dataset loading.
//! Turns the raw search-backend response into the canonical, sorted entry list.
//! Records missing a label or a definition are dropped, not reported.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::{normalize_phrase, DatasetError, IdField, TerminologyEntry};

/// Load entries from an already parsed response document.
///
/// Expected shape: `{ "hits": { "hits": [ { "_source": { "prefLabel", "definition", "id", "context" } } ] } }`.
/// A missing `hits.hits` array yields an empty list. Only a non-object top level is an error.
pub fn load(raw: &Value, id_field: IdField) -> Result<Vec<TerminologyEntry>, DatasetError> {
    let Some(root) = raw.as_object() else {
        return Err(DatasetError::Malformed(format!(
            "expected a JSON object at the top level, got {}",
            value_kind(raw)
        )));
    };

    let records = root
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut entries: Vec<TerminologyEntry> = records
        .iter()
        .filter_map(|record| parse_record(record, id_field))
        .collect();

    let dropped = records.len() - entries.len();
    if dropped > 0 {
        debug!(dropped, kept = entries.len(), "dropped incomplete terminology records");
    }

    sort_canonical(&mut entries);
    Ok(entries)
}

/// Parse a JSON body and load entries from it.
pub fn load_str(body: &str, id_field: IdField) -> Result<Vec<TerminologyEntry>, DatasetError> {
    let raw: Value = serde_json::from_str(body)?;
    load(&raw, id_field)
}

fn parse_record(record: &Value, id_field: IdField) -> Option<TerminologyEntry> {
    let source = record.get("_source").or_else(|| record.get("source"))?;

    let label = string_field(source, "prefLabel");
    let key_phrase = normalize_phrase(label);
    let description = string_field(source, "definition");

    if key_phrase.is_empty() || description.trim().is_empty() {
        return None;
    }

    Some(TerminologyEntry {
        label: label.to_string(),
        key_phrase,
        description: description.to_string(),
        reference: string_field(source, id_field.as_str()).to_string(),
    })
}

/// String value of `field`, or "" when absent or not a string.
fn string_field<'a>(source: &'a Value, field: &str) -> &'a str {
    source.get(field).and_then(Value::as_str).unwrap_or("")
}

/// Stable sort by collation key, then by the raw key phrase.
pub fn sort_canonical(entries: &mut [TerminologyEntry]) {
    entries.sort_by_cached_key(|e| (collation_key(&e.key_phrase), e.key_phrase.clone()));
}

/// Compare two phrases the way the canonical list is ordered.
pub fn compare_phrases(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

/// Case- and accent-insensitive sort key: "Één" and "een" collate together.
fn collation_key(phrase: &str) -> String {
    phrase
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
