//! Dataset sources.
//! A source either yields a JSON body or nothing. Transport failures are logged
//! here and never reach the index layer.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Something that can produce the raw terminology document.
pub trait DatasetSource: Send + Sync {
    /// Human readable location, for logs.
    fn describe(&self) -> String;

    /// Fetch the body. `None` covers every failure: network, status, empty body, cancellation.
    fn fetch(&self, cancel: &CancellationToken) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Debug)]
pub enum SourceError {
    InvalidUrl(String),
    Client(reqwest::Error),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::InvalidUrl(url) => write!(f, "invalid dataset url: {url}"),
            SourceError::Client(e) => write!(f, "http client error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Client(e)
    }
}

/// Plain GET against a configured URL, no authentication.
pub struct HttpSource {
    http: reqwest::Client,
    url: reqwest::Url,
    max_5xx_retries: u32,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let url = reqwest::Url::parse(url).map_err(|_| SourceError::InvalidUrl(url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::InvalidUrl(url.to_string()));
        }

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url,
            max_5xx_retries: 2,
        })
    }

    /// GET with retry.
    /// 5xx: exponential backoff (max 2). Timeout: immediate retry once. Other statuses are final.
    async fn get_with_retry(&self, cancel: &CancellationToken) -> Option<reqwest::Response> {
        let mut attempt: u32 = 0;
        let mut timeout_retried = false;

        loop {
            let result = tokio::select! {
                r = self.http.get(self.url.clone()).header("Accept", "application/json").send() => r,
                _ = cancel.cancelled() => {
                    debug!(url = %self.url, "dataset fetch cancelled");
                    return None;
                }
            };

            match result {
                Ok(resp) if resp.status() == reqwest::StatusCode::OK => return Some(resp),
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt >= self.max_5xx_retries {
                        warn!(url = %self.url, status = resp.status().as_u16(), "dataset fetch failed");
                        return None;
                    }
                    let wait = Duration::from_millis(500 * (1 << attempt));
                    warn!(
                        attempt,
                        status = resp.status().as_u16(),
                        wait_ms = wait.as_millis() as u64,
                        "5xx from dataset source, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return None,
                    }
                    attempt += 1;
                }
                Ok(resp) => {
                    warn!(url = %self.url, status = resp.status().as_u16(), "dataset fetch failed");
                    return None;
                }
                Err(e) if e.is_timeout() => {
                    if timeout_retried {
                        warn!(url = %self.url, "dataset fetch timed out");
                        return None;
                    }
                    warn!("dataset request timeout, retrying once");
                    timeout_retried = true;
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "dataset fetch failed");
                    return None;
                }
            }
        }
    }
}

impl DatasetSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    fn fetch(&self, cancel: &CancellationToken) -> impl Future<Output = Option<String>> + Send {
        async move {
            let resp = self.get_with_retry(cancel).await?;
            let body = tokio::select! {
                b = resp.text() => b,
                _ = cancel.cancelled() => return None,
            };
            match body {
                Ok(text) if !text.trim().is_empty() => Some(text),
                Ok(_) => {
                    warn!(url = %self.url, "dataset body empty");
                    None
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "dataset body read failed");
                    None
                }
            }
        }
    }
}

/// A dataset stored as a local JSON file.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, cancel: &CancellationToken) -> impl Future<Output = Option<String>> + Send {
        async move {
            let read = tokio::select! {
                r = tokio::fs::read_to_string(&self.path) => r,
                _ = cancel.cancelled() => return None,
            };
            match read {
                Ok(text) if !text.trim().is_empty() => Some(text),
                Ok(_) => {
                    warn!(path = %self.path.display(), "dataset file empty");
                    None
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "dataset file read failed");
                    None
                }
            }
        }
    }
}

/// An in-memory body. `None` behaves like an unreachable source.
pub struct InlineSource {
    body: Option<String>,
}

impl InlineSource {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    pub fn unavailable() -> Self {
        Self { body: None }
    }
}

impl DatasetSource for InlineSource {
    fn describe(&self) -> String {
        "inline".to_string()
    }

    fn fetch(&self, _cancel: &CancellationToken) -> impl Future<Output = Option<String>> + Send {
        let body = self.body.clone().filter(|b| !b.trim().is_empty());
        async move { body }
    }
}

/// Where the dataset comes from, as given on the command line or in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Http(String),
    File(PathBuf),
}

impl SourceSpec {
    /// `http://` and `https://` locations are fetched, anything else is a file path.
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceSpec::Http(location.to_string())
        } else {
            SourceSpec::File(PathBuf::from(location))
        }
    }

    pub fn open(&self, timeout: Duration) -> Result<ConfiguredSource, SourceError> {
        Ok(match self {
            SourceSpec::Http(url) => ConfiguredSource::Http(HttpSource::new(url, timeout)?),
            SourceSpec::File(path) => ConfiguredSource::File(FileSource::new(path.clone())),
        })
    }
}

/// A source chosen at runtime.
pub enum ConfiguredSource {
    Http(HttpSource),
    File(FileSource),
}

impl DatasetSource for ConfiguredSource {
    fn describe(&self) -> String {
        match self {
            ConfiguredSource::Http(s) => s.describe(),
            ConfiguredSource::File(s) => s.describe(),
        }
    }

    fn fetch(&self, cancel: &CancellationToken) -> impl Future<Output = Option<String>> + Send {
        async move {
            match self {
                ConfiguredSource::Http(s) => s.fetch(cancel).await,
                ConfiguredSource::File(s) => s.fetch(cancel).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_parses_urls_and_paths() {
        assert_eq!(
            SourceSpec::parse(" HTTPS://example.org/terms.json "),
            SourceSpec::Http("HTTPS://example.org/terms.json".into())
        );
        assert_eq!(
            SourceSpec::parse("data/terms.json"),
            SourceSpec::File(PathBuf::from("data/terms.json"))
        );
    }

    #[test]
    fn http_source_rejects_bad_urls() {
        assert!(matches!(
            HttpSource::new("not a url", Duration::from_secs(1)),
            Err(SourceError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpSource::new("ftp://example.org/x", Duration::from_secs(1)),
            Err(SourceError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn inline_source_yields_body_or_nothing() {
        let token = CancellationToken::new();
        assert_eq!(InlineSource::new("{}").fetch(&token).await.as_deref(), Some("{}"));
        assert_eq!(InlineSource::new("  ").fetch(&token).await, None);
        assert_eq!(InlineSource::unavailable().fetch(&token).await, None);
    }

    #[tokio::test]
    async fn file_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");
        std::fs::write(&path, r#"{"hits":{"hits":[]}}"#).unwrap();

        let token = CancellationToken::new();
        assert!(FileSource::new(&path).fetch(&token).await.is_some());
        assert!(FileSource::new(dir.path().join("missing.json"))
            .fetch(&token)
            .await
            .is_none());
    }
}
