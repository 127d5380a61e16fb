//! `termscan` command line: search the terminology dataset or scan a text file for known terms.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use termscan::metrics::Stage;
use termscan::scanner::{self, Tokenizer};
use termscan::terminology::SourceSpec;
use termscan::{Config, IdField, TerminologyStore, TextMatch};

#[derive(Parser)]
#[command(name = "termscan", version, about = "Terminology search and document scanning")]
struct Cli {
    /// Dataset URL or file path (overrides TERMSCAN_SOURCE).
    #[arg(long, global = true)]
    source: Option<String>,

    /// Record field used as the entry reference: `id` or `context`.
    #[arg(long, global = true)]
    id_field: Option<IdField>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search entries; prefix the query with `=` for an exact match.
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Report terminology found in a text file, paragraph by paragraph.
    Scan {
        file: PathBuf,
        /// Ignore words shorter than this many characters.
        #[arg(long, default_value_t = 1)]
        min_len: usize,
        /// Words to skip while scanning (repeatable).
        #[arg(long = "ignore")]
        ignored: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Print entry and bucket counts.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct LineMatch {
    line: usize,
    #[serde(flatten)]
    found: TextMatch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    termscan::init_tracing(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "termscan failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;
    if let Some(source) = cli.source {
        config.source = source;
    }
    if let Some(id_field) = cli.id_field {
        config.id_field = id_field;
    }

    let source = SourceSpec::parse(&config.source).open(config.timeout())?;
    let store = TerminologyStore::with_config(&config);

    let outcome = store.initialize(&source).await;
    if !outcome.is_loaded() {
        eprintln!("terminology dataset could not be loaded from {}", config.source);
        return Ok(ExitCode::from(2));
    }
    info!(?outcome, "dataset ready");

    match cli.command {
        Command::Search { query, json } => {
            let results = store.search(&query);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("Nothing found");
            } else {
                for entry in &results.hits {
                    println!("{}\n  {}\n  {}\n", entry.label, entry.description, entry.reference);
                }
                if results.is_truncated() {
                    println!(
                        "First {} of {} results. Please refine your search.",
                        results.hits.len(),
                        results.total
                    );
                }
            }
        }
        Command::Scan {
            file,
            min_len,
            ignored,
            json,
        } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let Some(snapshot) = store.snapshot() else {
                return Ok(ExitCode::from(2));
            };
            let tokenizer = Tokenizer::new().with_min_len(min_len).with_ignored(&ignored);

            let span = store.metrics().span(Stage::Scan);
            let found: Vec<LineMatch> = text
                .lines()
                .enumerate()
                .flat_map(|(n, paragraph)| {
                    scanner::scan_text(&snapshot.index, &tokenizer, paragraph)
                        .into_iter()
                        .map(move |found| LineMatch { line: n + 1, found })
                })
                .collect();
            span.finish();

            if json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                for m in &found {
                    println!(
                        "{}:{}\t{}\t{} [{}]",
                        m.line,
                        m.found.start + 1,
                        m.found.text,
                        m.found.entry.label,
                        m.found.entry.reference
                    );
                }
            }
        }
        Command::Stats { json } => {
            let Some(stats) = store.stats() else {
                return Ok(ExitCode::from(2));
            };
            let timings = store.metrics().summary();
            if json {
                let report = serde_json::json!({ "index": stats, "timings": timings });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "entries: {}\nbuckets: {}\nlargest bucket: {}\nlongest phrase: {} words",
                    stats.entries, stats.buckets, stats.largest_bucket, stats.longest_phrase_words
                );
                for t in &timings {
                    println!("{:?}: p50 {:.0}us, p99 {:.0}us", t.stage, t.p50_us, t.p99_us);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
