//! termscan: terminology cache and multi-word phrase matching.
//! Loads a terminology dataset, indexes it by first word, and answers
//! contains/exact searches and longest-match token scans.

pub mod cancellation;
pub mod config;
pub mod metrics;
pub mod scanner;
pub mod terminology;

pub use config::Config;
pub use scanner::{TextMatch, Token, Tokenizer};
pub use terminology::{
    IdField, InitOutcome, SearchQuery, SearchResults, TerminologyEntry, TerminologyIndex,
    TerminologyStore,
};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("termscan=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // Ignore the error when a subscriber is already installed (tests, embedding hosts).
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
