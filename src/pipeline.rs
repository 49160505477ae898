use crate::batch::BatchScraper;
use crate::config::PipelineConfig;
use crate::error::{FetchError, InputError, PipelineError};
use crate::fetchers::http::HttpFetcher;
use crate::fetchers::proxy::ProxyFetcher;
use crate::fetchers::webdriver::WebDriverFetcher;
use crate::fetchers::{FallbackFetcher, Fetcher};
use crate::filter::ResultFilter;
use crate::outline::Outline;
use crate::redirect::RedirectResolver;
use crate::results::ScrapeBatchResult;
use crate::search::result_set::parse_seeds;
use crate::search::{ResultSet, ResultSetBuilder, SearchQuery};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// The fetchers one run uses, constructed once and shared by reference
pub struct Fetchers {
    /// Direct search engine queries
    pub search: Arc<dyn Fetcher>,
    /// Direct redirect resolution
    pub resolve: Arc<dyn Fetcher>,
    /// Page scraping (direct or rendered, with proxy fallback when available)
    pub scrape: Arc<dyn Fetcher>,
    /// Proxy/rendering service, when configured
    pub proxy: Option<Arc<dyn Fetcher>>,
    /// Extra host to exclude from results (the proxy endpoint)
    pub proxy_host: Option<String>,
    webdriver: Option<Arc<WebDriverFetcher>>,
}

impl Fetchers {
    /// Build the standard fetchers from configuration. No network activity.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, FetchError> {
        let search: Arc<dyn Fetcher> =
            Arc::new(HttpFetcher::new(&config.http, config.http.timeout())?.named("search"));
        let resolve: Arc<dyn Fetcher> =
            Arc::new(HttpFetcher::new(&config.http, config.resolver.timeout())?.named("resolve"));

        let (proxy, proxy_host) = if config.proxy.api_key.is_some() {
            let transport: Arc<dyn Fetcher> =
                Arc::new(HttpFetcher::new(&config.http, config.proxy.timeout())?.named("proxy-http"));
            let proxy = ProxyFetcher::new(transport, config.proxy.clone())?;
            let host = proxy.host();
            (Some(Arc::new(proxy) as Arc<dyn Fetcher>), host)
        } else {
            ::log::info!("No proxy API key configured; proxied fallbacks disabled");
            (None, None)
        };

        let (primary, webdriver) = if config.scrape.use_webdriver {
            let webdriver = Arc::new(WebDriverFetcher::new(
                &config.render.webdriver_url,
                config.scrape.timeout(),
            ));
            (Arc::clone(&webdriver) as Arc<dyn Fetcher>, Some(webdriver))
        } else {
            let http = HttpFetcher::new(&config.http, config.scrape.timeout())?.named("scrape");
            (Arc::new(http) as Arc<dyn Fetcher>, None)
        };

        let scrape = match &proxy {
            Some(proxy) => Arc::new(FallbackFetcher::new(primary, Arc::clone(proxy))) as Arc<dyn Fetcher>,
            None => primary,
        };

        Ok(Self {
            search,
            resolve,
            scrape,
            proxy,
            proxy_host,
            webdriver,
        })
    }

    /// Use one fetcher for everything
    pub fn single(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            search: Arc::clone(&fetcher),
            resolve: Arc::clone(&fetcher),
            scrape: fetcher,
            proxy: None,
            proxy_host: None,
            webdriver: None,
        }
    }
}

/// Everything one run produced
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub query: String,
    /// Discovered (and seeded) URLs in rank order
    pub result_set: ResultSet,
    /// Fewer results than the configured minimum were found
    pub shortfall: bool,
    pub pages: ScrapeBatchResult,
}

impl PipelineReport {
    /// Heading outline of a scraped page
    pub fn outline(&self, url: &str) -> Option<Outline> {
        let page = self.pages.get(url)?.page()?;
        Some(Outline::from_headings(&page.headings))
    }
}

/// Builder for one keyword -> scraped pages run
pub struct Pipeline {
    config: PipelineConfig,
    seeds: Vec<String>,
    fetchers: Option<Fetchers>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            seeds: Vec::new(),
            fetchers: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, PipelineError> {
        self.config = PipelineConfig::from_file(path)?;
        Ok(self)
    }

    /// Apply configuration from a JSON string
    pub fn with_config_str(mut self, json: &str) -> Result<Self, PipelineError> {
        self.config = PipelineConfig::from_json(json)?;
        Ok(self)
    }

    pub fn with_max_results(mut self, value: usize) -> Self {
        self.config.search.max_results = value;
        self
    }

    pub fn with_min_results(mut self, value: usize) -> Self {
        self.config.search.min_results = value;
        self
    }

    pub fn with_concurrency(mut self, value: usize) -> Self {
        self.config.scrape.concurrency = value;
        self
    }

    /// Total fetch attempts per page
    pub fn with_retries(mut self, value: u32) -> Self {
        self.config.scrape.retry.max_attempts = value;
        self
    }

    /// Timeout for every direct request, in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.config.scrape.timeout_secs = seconds;
        self.config.resolver.timeout_secs = seconds;
        self.config.http.timeout_secs = seconds;
        self
    }

    /// Manual URLs merged in when engines come up short
    pub fn with_seed_urls(mut self, seeds: Vec<String>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Replace the standard fetchers
    pub fn with_fetchers(mut self, fetchers: Fetchers) -> Self {
        self.fetchers = Some(fetchers);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover result URLs for `query` and scrape them.
    ///
    /// Input and configuration are validated before any network activity;
    /// that is the only way this fails.
    pub async fn run(self, query: &str) -> Result<PipelineReport, PipelineError> {
        self.config.validate()?;
        let query = SearchQuery::new(query)?;
        parse_seeds(&self.seeds)?;

        let fetchers = match self.fetchers {
            Some(fetchers) => fetchers,
            None => Fetchers::from_config(&self.config).map_err(|e| PipelineError::Client(e.to_string()))?,
        };

        let start = Instant::now();
        ::log::info!("Starting run for \"{}\"", query);

        let mut filter = ResultFilter::from_config(&self.config.resolver)
            .map_err(|e| InputError::InvalidConfig(e.to_string()))?;
        if let Some(host) = &fetchers.proxy_host {
            filter.block_host(host);
        }
        let filter = Arc::new(filter);

        let mut resolver = RedirectResolver::new(Arc::clone(&fetchers.resolve), Arc::clone(&filter));
        if let Some(proxy) = &fetchers.proxy {
            resolver = resolver.with_proxy(Arc::clone(proxy));
        }

        let mut builder = ResultSetBuilder::new(
            Arc::clone(&fetchers.search),
            Arc::new(resolver),
            self.config.search.clone(),
        );
        if let Some(proxy) = &fetchers.proxy {
            builder = builder.with_proxy(Arc::clone(proxy));
        }

        let min_results = self.config.search.min_results;
        let mut result_set = builder.build_default(&query).await?;

        if !self.seeds.is_empty() {
            if result_set.is_shortfall(min_results) {
                let added = result_set.merge_seeds(&self.seeds, &filter)?;
                ::log::info!("Merged {} of {} seed URLs", added, self.seeds.len());
            } else {
                ::log::info!("Engines found enough results; seed URLs not needed");
            }
        }

        let scraper = BatchScraper::new(
            Arc::clone(&fetchers.scrape),
            self.config.scrape.concurrency,
            self.config.scrape.retry,
        );
        let pages = scraper.scrape_all(result_set.urls()).await;

        if let Some(webdriver) = &fetchers.webdriver {
            webdriver.close().await;
        }

        ::log::info!(
            "Run for \"{}\" finished in {:.2} seconds: {} results, {} pages scraped",
            query,
            start.elapsed().as_secs_f64(),
            result_set.len(),
            pages.success_count()
        );

        Ok(PipelineReport {
            query: query.to_string(),
            shortfall: result_set.is_shortfall(min_results),
            result_set,
            pages,
        })
    }
}
