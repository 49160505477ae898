use crate::config::ProxyConfig;
use crate::error::FetchError;
use crate::fetchers::fetcher::{FetchedPage, Fetcher};
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Routes every fetch through a fetch-and-render proxy service.
///
/// The proxy is a URL-rewriting wrapper: the target URL is passed as a query
/// parameter to the proxy endpoint and the inner fetcher performs the actual
/// request. Redirects happen on the proxy side, so the returned page reports
/// the target URL as its final URL.
pub struct ProxyFetcher {
    inner: Arc<dyn Fetcher>,
    config: ProxyConfig,
}

impl ProxyFetcher {
    /// Wrap `inner`; fails if no API key is configured
    pub fn new(inner: Arc<dyn Fetcher>, config: ProxyConfig) -> Result<Self, FetchError> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(FetchError::ProxyNotConfigured);
        }
        Ok(Self { inner, config })
    }

    /// Host of the proxy endpoint, which must never appear as a result
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.config.api_base)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }

    /// Rewrite a target URL into a proxy request URL
    pub fn proxied_url(&self, target: &str) -> Result<String, FetchError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(FetchError::ProxyNotConfigured)?;

        let mut params = vec![("api_key", api_key), ("url", target)];
        if self.config.render {
            params.push(("render", "true"));
        }

        Url::parse_with_params(&self.config.api_base, &params)
            .map(|u| u.to_string())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    /// Strip the request URL (and with it the API key) from an inner error,
    /// since error text ends up in logs and scrape reports
    fn redact(&self, error: FetchError) -> FetchError {
        let scrub = |text: String| match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => text.replace(key, "[redacted]"),
            _ => text,
        };

        match error {
            FetchError::Http(e) => FetchError::Http(e.without_url()),
            FetchError::InvalidUrl(text) => FetchError::InvalidUrl(scrub(text)),
            FetchError::NotHtml(text) => FetchError::NotHtml(scrub(text)),
            FetchError::Render(text) => FetchError::Render(scrub(text)),
            other => other,
        }
    }
}

#[async_trait]
impl Fetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let proxied = self.proxied_url(url)?;
        ::log::trace!("Proxying {} via {}", url, self.config.api_base);
        let page = self
            .inner
            .fetch(&proxied)
            .await
            .map_err(|e| self.redact(e))?;
        ::log::debug!("proxy fetched {} ({} bytes)", url, page.body.len());
        Ok(FetchedPage::new(url, page.body))
    }

    fn name(&self) -> &str {
        "proxy"
    }
}
