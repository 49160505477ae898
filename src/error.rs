use std::time::Duration;
use thiserror::Error;

/// Errors raised while fetching a single document.
///
/// All of these are recoverable: callers retry them under a `RetryPolicy`
/// and, once attempts run out, record a per-URL failure instead of failing
/// the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status code: {0}")]
    Status(u16),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Failed to parse URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid content type: {0}")]
    NotHtml(String),
    #[error("Render error: {0}")]
    Render(String),
    #[error("No proxy API key configured")]
    ProxyNotConfigured,
}

/// Precondition violations detected before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Search query must not be empty")]
    EmptyQuery,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid seed URL: {0}")]
    InvalidSeedUrl(String),
}

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// The only errors a pipeline run can return.
///
/// Network and parse failures never surface here; they are folded into the
/// result set and the scrape batch result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}
