use crate::config::HttpConfig;
use crate::error::FetchError;
use crate::fetchers::fetcher::{FetchedPage, Fetcher};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::{Duration, Instant};

/// Direct HTTP fetcher backed by a single reqwest client.
///
/// Constructed once per pipeline run and shared by reference; the client's
/// connection pool is the only shared state.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    name: String,
}

impl HttpFetcher {
    /// Build a fetcher with browser-like default headers and the given timeout
    pub fn new(config: &HttpConfig, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        if let Ok(value) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(header::ACCEPT_LANGUAGE, value);
        }
        headers.insert(header::DNT, HeaderValue::from_static("1"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(&config.user_agent)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            timeout,
            name: "http".to_string(),
        })
    }

    /// Rename the fetcher for log lines
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn map_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Http(error)
        }
    }
}

/// Query parameters whose values never go into log lines
const SECRET_PARAMS: [&str; 3] = ["api_key", "key", "token"];

/// URL text for logging with credential-like query values masked
fn log_safe(url: &url::Url) -> String {
    if !url.query_pairs().any(|(k, _)| SECRET_PARAMS.contains(&k.as_ref())) {
        return url.to_string();
    }

    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if SECRET_PARAMS.contains(&k.as_ref()) {
                "[redacted]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

/// Only markup is worth parsing; a missing content type is given the benefit of the doubt
fn is_markup(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html")
        || content_type.contains("application/xhtml")
        || content_type.contains("text/plain")
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let logged_url = log_safe(response.url());

        if let Some(content_type) = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_markup(content_type) {
                return Err(FetchError::NotHtml(content_type.to_string()));
            }
        }

        let body = response.text().await.map_err(|e| self.map_error(e))?;

        ::log::debug!(
            "{} fetched {} ({} bytes) in {:.2} seconds",
            self.name,
            logged_url,
            body.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(FetchedPage::new(final_url, body))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
