//! Runtime configuration, read from `TERMSCAN_*` environment variables.
//! Command-line flags override individual fields.

use std::time::Duration;

use crate::terminology::{DatasetError, IdField};

pub const DEFAULT_SOURCE: &str = "data/terminology.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// URL or file path of the dataset.
    pub source: String,
    /// Record field that populates `reference`.
    pub id_field: IdField,
    pub timeout_secs: u64,
    /// Hits returned by an interactive search.
    pub max_results: usize,
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            id_field: IdField::Id,
            timeout_secs: 20,
            max_results: 100,
            cache_capacity: 256,
            cache_ttl_secs: 600,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { var: &'static str, value: String },
    InvalidIdField(DatasetError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var}: invalid value `{value}`")
            }
            ConfigError::InvalidIdField(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Defaults overridden by whichever `TERMSCAN_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(source) = get("TERMSCAN_SOURCE").filter(|s| !s.trim().is_empty()) {
            config.source = source.trim().to_string();
        }
        if let Some(field) = get("TERMSCAN_ID_FIELD") {
            config.id_field = field.parse().map_err(ConfigError::InvalidIdField)?;
        }
        if let Some(v) = positive(&get, "TERMSCAN_TIMEOUT_SECS")? {
            config.timeout_secs = v;
        }
        if let Some(v) = positive(&get, "TERMSCAN_MAX_RESULTS")? {
            config.max_results = v as usize;
        }
        if let Some(v) = number(&get, "TERMSCAN_CACHE_CAPACITY")? {
            config.cache_capacity = v as usize;
        }
        if let Some(v) = number(&get, "TERMSCAN_CACHE_TTL_SECS")? {
            config.cache_ttl_secs = v;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn number(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

/// Like `number`, but zero is rejected.
fn positive(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match number(get, var)? {
        Some(0) => Err(ConfigError::InvalidNumber {
            var,
            value: "0".to_string(),
        }),
        v => Ok(v),
    }
}
