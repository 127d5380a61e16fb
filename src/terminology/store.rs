//! Published terminology store.
//! Fetch, load and build run to completion before the new index is published
//! through a watch channel. Readers clone an `Arc<Snapshot>` and never see a
//! partially built index. A failed reload leaves the previous snapshot in place.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::cache::SearchCache;
use super::dataset;
use super::index::{IndexStats, TerminologyIndex};
use super::query::{SearchQuery, SearchResults};
use super::source::DatasetSource;
use super::{IdField, TerminologyEntry};
use crate::cancellation::{ReloadGeneration, ReloadGuard};
use crate::config::Config;
use crate::metrics::{MetricsRegistry, Stage};

/// An index together with the reload generation that built it.
#[derive(Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub index: TerminologyIndex,
}

/// Result of `initialize` / `reload`. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InitOutcome {
    Loaded {
        generation: u64,
        entries: usize,
        buckets: usize,
    },
    /// Already initialized; nothing was fetched.
    AlreadyReady,
    /// The source yielded nothing.
    Unavailable,
    Malformed(String),
    /// A newer reload started before this one could publish.
    Superseded,
}

impl InitOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, InitOutcome::Loaded { .. })
    }
}

pub struct TerminologyStore {
    id_field: IdField,
    max_results: usize,
    published: watch::Sender<Option<Arc<Snapshot>>>,
    /// Serializes loads so a second `initialize` waits for the first.
    load_lock: Mutex<()>,
    generations: ReloadGeneration,
    cache: SearchCache,
    metrics: Arc<MetricsRegistry>,
}

impl TerminologyStore {
    pub fn new(id_field: IdField) -> Self {
        Self::with_config(&Config {
            id_field,
            ..Config::default()
        })
    }

    pub fn with_config(config: &Config) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            id_field: config.id_field,
            max_results: config.max_results,
            published,
            load_lock: Mutex::new(()),
            generations: ReloadGeneration::new(),
            cache: SearchCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            ),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Load and publish the dataset unless an index is already published.
    pub async fn initialize<S: DatasetSource>(&self, source: &S) -> InitOutcome {
        let _lock = self.load_lock.lock().await;
        if self.is_ready() {
            debug!("terminology store already initialized");
            return InitOutcome::AlreadyReady;
        }
        let guard = self.generations.begin();
        self.load_and_publish(source, &guard).await
    }

    /// Always fetch again. Cancels any older load still in flight.
    /// On failure the previous snapshot stays published.
    pub async fn reload<S: DatasetSource>(&self, source: &S) -> InitOutcome {
        self.generations.cancel_all();
        let _lock = self.load_lock.lock().await;
        // Generations only advance under the load lock, so a load queued
        // behind this one can cancel it but never skip it.
        let guard = self.generations.begin();
        self.load_and_publish(source, &guard).await
    }

    async fn load_and_publish<S: DatasetSource>(
        &self,
        source: &S,
        guard: &ReloadGuard,
    ) -> InitOutcome {
        let location = source.describe();
        if !guard.should_continue() {
            return InitOutcome::Superseded;
        }

        let span = self.metrics.span(Stage::Fetch);
        let body = source.fetch(guard.token()).await;
        span.finish();

        if !guard.should_continue() {
            debug!(generation = guard.my_generation(), "reload superseded during fetch");
            return InitOutcome::Superseded;
        }

        let Some(body) = body else {
            warn!(source = %location, "terminology dataset unavailable");
            return InitOutcome::Unavailable;
        };

        let span = self.metrics.span(Stage::Build);
        let entries = match dataset::load_str(&body, self.id_field) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = %location, error = %e, "terminology dataset rejected");
                return InitOutcome::Malformed(e.to_string());
            }
        };
        let index = TerminologyIndex::build(entries);
        span.finish();

        if !guard.should_continue() {
            debug!(generation = guard.my_generation(), "reload superseded during build");
            return InitOutcome::Superseded;
        }

        let outcome = InitOutcome::Loaded {
            generation: guard.my_generation(),
            entries: index.len(),
            buckets: index.bucket_count(),
        };
        self.published.send_replace(Some(Arc::new(Snapshot {
            generation: guard.my_generation(),
            index,
        })));

        info!(
            source = %location,
            generation = guard.my_generation(),
            ?outcome,
            "terminology index published"
        );
        outcome
    }

    /// The published snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.published.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.published.borrow().is_some()
    }

    /// Wait until a snapshot is published. Resolves immediately when already ready.
    pub async fn wait_ready(&self) -> Arc<Snapshot> {
        let mut rx = self.published.subscribe();
        loop {
            if let Some(snapshot) = rx.borrow_and_update().clone() {
                return snapshot;
            }
            // The sender lives in `self`, so the channel stays open while we wait.
            let _ = rx.changed().await;
        }
    }

    pub fn stats(&self) -> Option<IndexStats> {
        self.snapshot().map(|s| s.index.stats())
    }

    /// Phrase lookup against the published index; empty when nothing is published.
    pub fn lookup(&self, phrase: &str, exact: bool) -> Vec<TerminologyEntry> {
        let Some(snapshot) = self.snapshot() else {
            return Vec::new();
        };
        let span = self.metrics.span(Stage::Lookup);
        let hits = snapshot
            .index
            .lookup(phrase, exact)
            .into_iter()
            .cloned()
            .collect();
        span.finish();
        hits
    }

    /// Longest match at `start`; `None` when nothing is published.
    pub fn match_at<S: AsRef<str>>(&self, tokens: &[S], start: usize) -> Option<usize> {
        self.snapshot()?.index.match_at(tokens, start)
    }

    /// Search box entry point: `=` prefix for exact, cached, truncated to `max_results`.
    pub fn search(&self, input: &str) -> SearchResults {
        let Some(query) = SearchQuery::parse(input) else {
            return SearchResults::default();
        };
        self.search_query(&query)
    }

    pub fn search_query(&self, query: &SearchQuery) -> SearchResults {
        let Some(snapshot) = self.snapshot() else {
            return SearchResults::default();
        };

        let key = SearchCache::compute_key(snapshot.generation, query.exact, &query.phrase);
        let hits = match self.cache.get(&key) {
            Some(hits) => hits,
            None => {
                let span = self.metrics.span(Stage::Lookup);
                let hits: Arc<[TerminologyEntry]> = snapshot
                    .index
                    .lookup(&query.phrase, query.exact)
                    .into_iter()
                    .cloned()
                    .collect();
                span.finish();
                self.cache.insert(key, Arc::clone(&hits));
                hits
            }
        };
        SearchResults::new(&hits, self.max_results)
    }
}
