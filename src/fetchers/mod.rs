pub mod fetcher;
pub mod http;
pub mod proxy;
pub mod retry;
pub mod webdriver;

pub use fetcher::{FetchedPage, Fetcher};

use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::Arc;

/// Tries `primary` first and falls back to `fallback` when it fails.
///
/// This is how a blocked direct fetch gets a second chance through the
/// proxy/rendering service.
pub struct FallbackFetcher {
    primary: Arc<dyn Fetcher>,
    fallback: Arc<dyn Fetcher>,
    name: String,
}

impl FallbackFetcher {
    pub fn new(primary: Arc<dyn Fetcher>, fallback: Arc<dyn Fetcher>) -> Self {
        let name = format!("{}+{}", primary.name(), fallback.name());
        Self {
            primary,
            fallback,
            name,
        }
    }
}

#[async_trait]
impl Fetcher for FallbackFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self.primary.fetch(url).await {
            Ok(page) => Ok(page),
            Err(e) => {
                ::log::debug!(
                    "{} failed for {} ({}), falling back to {}",
                    self.primary.name(),
                    url,
                    e,
                    self.fallback.name()
                );
                self.fallback.fetch(url).await
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
