use crate::error::FetchError;
use async_trait::async_trait;

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Where the document was actually served from after redirects
    pub final_url: String,

    /// Raw HTML body
    pub body: String,
}

impl FetchedPage {
    pub fn new(final_url: impl Into<String>, body: String) -> Self {
        Self {
            final_url: final_url.into(),
            body,
        }
    }
}

/// Retrieves raw HTML for a URL.
///
/// Implementations are shared read-only across concurrent fetches, so they
/// must be `Send + Sync` and must bound every request with a timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single document
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Short name used in log lines
    fn name(&self) -> &str;
}
