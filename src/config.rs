use crate::error::{ConfigError, InputError};
use crate::fetchers::retry::RetryPolicy;
use crate::filter::default_exclude_patterns;
use crate::search::engine::{EngineAttempt, SearchEngine};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

/// Configuration for search-result discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound on the number of URLs in a result set
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Fewer results than this triggers the next engine attempt
    #[serde(default = "default_min_results")]
    pub min_results: usize,

    /// Attempts per engine request
    #[serde(default = "default_engine_retries")]
    pub engine_retries: u32,

    /// Ordered engine fallback chain
    #[serde(default = "default_engine_chain")]
    pub engines: Vec<EngineAttempt>,

    /// Number of candidate links resolved at once
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: usize,
}

/// Configuration for the concurrent batch scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Number of pages fetched at once within a batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-URL retry policy
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fetch pages through a WebDriver session instead of plain HTTP
    #[serde(default)]
    pub use_webdriver: bool,
}

/// Configuration for the redirect resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Hosts that never count as a real result
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: Vec<String>,

    /// Regex patterns for URLs that never count as a real result
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

/// Outbound HTTP client settings shared by every direct request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Request timeout for search engine queries in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

/// Configuration for the fetch-and-render proxy service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_api_base")]
    pub api_base: String,

    /// API key; `SCRAPERAPI_KEY` fills this in when absent
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Ask the proxy to render JavaScript before returning HTML
    #[serde(default)]
    pub render: bool,

    /// Proxy requests are slow; they get their own timeout in seconds
    #[serde(default = "default_proxy_timeout_secs")]
    pub timeout_secs: u64,
}

/// Configuration for the WebDriver rendering fetcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

fn default_max_results() -> usize {
    10
}

fn default_min_results() -> usize {
    5
}

fn default_engine_retries() -> u32 {
    3
}

fn default_engine_chain() -> Vec<EngineAttempt> {
    vec![
        EngineAttempt::direct(SearchEngine::Bing),
        EngineAttempt::direct(SearchEngine::DuckDuckGo),
        EngineAttempt::proxied(SearchEngine::Bing),
        EngineAttempt::proxied(SearchEngine::Google),
    ]
}

fn default_resolve_concurrency() -> usize {
    5
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_proxy_timeout_secs() -> u64 {
    60
}

fn default_max_redirects() -> usize {
    10
}

fn default_blocked_hosts() -> Vec<String> {
    ["bing.com", "google.com", "duckduckgo.com", "scraperapi.com"]
        .iter()
        .map(|h| h.to_string())
        .collect()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_proxy_api_base() -> String {
    "http://api.scraperapi.com".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_results: default_min_results(),
            engine_retries: default_engine_retries(),
            engines: default_engine_chain(),
            resolve_concurrency: default_resolve_concurrency(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            retry: RetryPolicy::default(),
            timeout_secs: default_timeout_secs(),
            use_webdriver: false,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            blocked_hosts: default_blocked_hosts(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            api_base: default_proxy_api_base(),
            api_key: None,
            render: false,
            timeout_secs: default_proxy_timeout_secs(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fill unset credentials and endpoints from the environment
    pub fn apply_env(mut self) -> Self {
        if self.proxy.api_key.is_none() {
            if let Ok(key) = std::env::var("SCRAPERAPI_KEY") {
                if !key.is_empty() {
                    self.proxy.api_key = Some(key);
                }
            }
        }

        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.render.webdriver_url = webdriver_url;
            }
        }

        self
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<(), InputError> {
        let invalid = |msg: &str| Err(InputError::InvalidConfig(msg.to_string()));

        if self.search.max_results == 0 {
            return invalid("max_results must be at least 1");
        }
        if self.search.min_results > self.search.max_results {
            return invalid("min_results must not exceed max_results");
        }
        if self.search.engines.is_empty() {
            return invalid("at least one search engine attempt is required");
        }
        if self.search.engine_retries == 0 {
            return invalid("engine_retries must be at least 1");
        }
        if self.search.resolve_concurrency == 0 {
            return invalid("resolve_concurrency must be at least 1");
        }
        if self.scrape.concurrency == 0 {
            return invalid("concurrency must be at least 1");
        }
        if self.scrape.retry.max_attempts == 0 {
            return invalid("max_attempts must be at least 1");
        }
        if let Some(pattern) = self
            .resolver
            .exclude_patterns
            .iter()
            .find(|p| regex::Regex::new(p).is_err())
        {
            return Err(InputError::InvalidConfig(format!(
                "invalid exclude pattern: {pattern}"
            )));
        }
        if self.scrape.timeout_secs == 0
            || self.resolver.timeout_secs == 0
            || self.http.timeout_secs == 0
            || self.proxy.timeout_secs == 0
        {
            return invalid("timeouts must be non-zero");
        }

        Ok(())
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::retry::Backoff;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.search.min_results, 5);
        assert_eq!(config.search.engines.len(), 4);
        assert_eq!(config.search.engines[0], EngineAttempt::direct(SearchEngine::Bing));
        assert_eq!(config.scrape.concurrency, 4);
        assert_eq!(config.scrape.retry.max_attempts, 3);
        assert!(config.proxy.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "search": { "max_results": 3, "min_results": 1, "engines": [{ "engine": "google", "via_proxy": true }] },
            "scrape": { "retry": { "max_attempts": 5, "backoff": { "kind": "exponential", "base_ms": 100, "factor": 2 } } }
        }"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.search.engines, vec![EngineAttempt::proxied(SearchEngine::Google)]);
        assert_eq!(config.search.engine_retries, 3);
        assert_eq!(config.scrape.retry.max_attempts, 5);
        assert_eq!(
            config.scrape.retry.backoff,
            Backoff::Exponential {
                base_ms: 100,
                factor: 2
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = PipelineConfig::default();
        config.search.min_results = 11;
        assert!(matches!(config.validate(), Err(InputError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.scrape.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.search.engines.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scrape.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let config = PipelineConfig::from_json(r#"{"resolver": {"exclude_patterns": ["(unclosed"]}}"#).unwrap();
        assert!(matches!(config.validate(), Err(InputError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            PipelineConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
