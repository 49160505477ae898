use crate::config::SearchConfig;
use crate::error::InputError;
use crate::fetchers::Fetcher;
use crate::fetchers::retry::RetryPolicy;
use crate::filter::ResultFilter;
use crate::parsers::serp;
use crate::redirect::RedirectResolver;
use crate::search::engine::EngineAttempt;
use crate::utils::registrable_domain;
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A validated, non-empty search keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(query: &str) -> Result<Self, InputError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InputError::EmptyQuery);
        }
        Ok(Self(query.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, domain-unique, bounded list of resolved result URLs.
///
/// Order is discovery order; on a registrable-domain collision the first
/// URL seen wins and later ones are dropped.
#[derive(Debug, Clone)]
pub struct ResultSet {
    urls: Vec<Url>,
    domains: HashSet<String>,
    max_results: usize,
}

impl ResultSet {
    pub fn new(max_results: usize) -> Self {
        Self {
            urls: Vec::with_capacity(max_results),
            domains: HashSet::new(),
            max_results,
        }
    }

    /// Append `url` unless the set is full or its domain is already present
    pub fn push(&mut self, url: Url) -> bool {
        if self.is_full() {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };

        let domain = registrable_domain(host);
        if !self.domains.insert(domain) {
            ::log::trace!("Duplicate domain dropped: {}", url);
            return false;
        }

        self.urls.push(url);
        true
    }

    /// Merge manually supplied URLs after the discovered ones.
    ///
    /// Seeds go through the same filter, deduplication and size bound.
    /// Any seed that is not an absolute http(s) URL is rejected up front and
    /// nothing is merged. Returns how many seeds were added.
    pub fn merge_seeds(&mut self, seeds: &[String], filter: &ResultFilter) -> Result<usize, InputError> {
        let parsed = parse_seeds(seeds)?;

        let mut added = 0;
        for url in parsed {
            if filter.accepts(&url) && self.push(filter.normalize_url(&url)) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.max_results
    }

    /// Whether fewer than `min_acceptable` results were collected
    pub fn is_shortfall(&self, min_acceptable: usize) -> bool {
        self.urls.len() < min_acceptable
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.urls.iter()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.urls.iter().map(Url::as_str))
    }
}

/// Parse seed URLs, failing on the first invalid one
pub fn parse_seeds(seeds: &[String]) -> Result<Vec<Url>, InputError> {
    seeds
        .iter()
        .map(|seed| match Url::parse(seed.trim()) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(url),
            _ => Err(InputError::InvalidSeedUrl(seed.clone())),
        })
        .collect()
}

/// Builds a result set for a query by walking the engine fallback chain.
pub struct ResultSetBuilder {
    direct: Arc<dyn Fetcher>,
    proxy: Option<Arc<dyn Fetcher>>,
    resolver: Arc<RedirectResolver>,
    config: SearchConfig,
}

impl ResultSetBuilder {
    pub fn new(direct: Arc<dyn Fetcher>, resolver: Arc<RedirectResolver>, config: SearchConfig) -> Self {
        Self {
            direct,
            proxy: None,
            resolver,
            config,
        }
    }

    /// Enable proxied engine attempts
    pub fn with_proxy(mut self, proxy: Arc<dyn Fetcher>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Build a result set with the configured bounds
    pub async fn build_default(&self, query: &SearchQuery) -> Result<ResultSet, InputError> {
        self.build(query, self.config.max_results, self.config.min_results)
            .await
    }

    /// Query engines in order until at least `min_acceptable` domain-unique
    /// results are collected, merging across attempts.
    ///
    /// Only invalid bounds are an error. Blocked engines, unparseable pages
    /// and unresolvable links all just contribute fewer results; a set below
    /// `min_acceptable` is a recoverable shortfall left to the caller.
    pub async fn build(
        &self,
        query: &SearchQuery,
        max_results: usize,
        min_acceptable: usize,
    ) -> Result<ResultSet, InputError> {
        if max_results == 0 {
            return Err(InputError::InvalidConfig("max_results must be at least 1".into()));
        }
        if min_acceptable > max_results {
            return Err(InputError::InvalidConfig(
                "min_results must not exceed max_results".into(),
            ));
        }

        ::log::info!("Building result set for \"{}\"", query);
        let mut result_set = ResultSet::new(max_results);

        for attempt in &self.config.engines {
            if result_set.len() >= min_acceptable && !result_set.is_empty() {
                break;
            }
            if result_set.is_full() {
                break;
            }

            let added = self.run_attempt(query, attempt, &mut result_set).await;
            ::log::info!(
                "{} added {} results ({} total)",
                attempt,
                added,
                result_set.len()
            );
        }

        if result_set.is_shortfall(min_acceptable) {
            ::log::warn!(
                "Only {} results for \"{}\" after all engines (wanted at least {})",
                result_set.len(),
                query,
                min_acceptable
            );
        }

        Ok(result_set)
    }

    /// Run one engine attempt; returns how many URLs it added
    async fn run_attempt(
        &self,
        query: &SearchQuery,
        attempt: &EngineAttempt,
        result_set: &mut ResultSet,
    ) -> usize {
        let fetcher = if attempt.via_proxy {
            match &self.proxy {
                Some(proxy) => proxy.clone(),
                None => {
                    ::log::warn!("Skipping {}: no proxy configured", attempt);
                    return 0;
                }
            }
        } else {
            self.direct.clone()
        };

        let search_url = attempt.engine.search_url(query.as_str());
        let policy = RetryPolicy::immediate(self.config.engine_retries);
        let label = format!("{} search", attempt);
        let page = match policy
            .run(&label, |_| fetcher.fetch(search_url.as_str()))
            .await
        {
            Ok(page) => page,
            Err(exhausted) => {
                ::log::warn!(
                    "{} failed after {} attempts: {}",
                    label,
                    exhausted.attempts,
                    exhausted.last_error
                );
                return 0;
            }
        };

        let candidates = serp::extract_links(&page.body, attempt.engine);
        if candidates.is_empty() {
            ::log::warn!("{} returned no parseable result links", attempt);
            return 0;
        }

        // `buffered` keeps rank order while resolving several links at once
        let resolved: Vec<Option<Url>> = stream::iter(candidates)
            .map(|link| {
                let resolver = Arc::clone(&self.resolver);
                async move { resolver.resolve(&link).await }
            })
            .buffered(self.config.resolve_concurrency.max(1))
            .collect()
            .await;

        let mut added = 0;
        for url in resolved.into_iter().flatten() {
            if result_set.push(url) {
                added += 1;
            }
            if result_set.is_full() {
                break;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::engine::SearchEngine;
    use crate::testing::FakeFetcher;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    /// Bing markup with direct (non-wrapped) organic links
    fn bing_page(links: &[&str]) -> String {
        let items: String = links
            .iter()
            .map(|l| format!(r#"<li class="b_algo"><h2><a href="{l}">Result</a></h2></li>"#))
            .collect();
        format!(r#"<html><body><ol id="b_results">{items}</ol></body></html>"#)
    }

    fn ddg_page(links: &[&str]) -> String {
        let items: String = links
            .iter()
            .map(|l| format!(r#"<div class="result"><a class="result__a" href="{l}">Result</a></div>"#))
            .collect();
        format!("<html><body>{items}</body></html>")
    }

    /// Fake fetcher serving the SERP plus a trivial page for every link
    fn fetcher_with(serps: &[(SearchEngine, String)], pages: &[&str]) -> FakeFetcher {
        let mut fetcher = FakeFetcher::new();
        for (engine, html) in serps {
            fetcher = fetcher.with_page(engine.search_url("supply chain visibility").as_str(), html);
        }
        for page in pages {
            fetcher = fetcher.with_page(page, "<title>page</title>");
        }
        fetcher
    }

    fn builder(fetcher: Arc<FakeFetcher>, engines: Vec<EngineAttempt>) -> ResultSetBuilder {
        let resolver = Arc::new(RedirectResolver::new(fetcher.clone(), Arc::new(ResultFilter::default())));
        let config = SearchConfig {
            engines,
            ..SearchConfig::default()
        };
        ResultSetBuilder::new(fetcher, resolver, config)
    }

    fn query() -> SearchQuery {
        SearchQuery::new("supply chain visibility").unwrap()
    }

    #[test]
    fn test_push_dedups_by_registrable_domain() {
        let mut set = ResultSet::new(10);
        assert!(set.push(url("https://www.example.com/a")));
        assert!(!set.push(url("https://blog.example.com/b")));
        assert!(set.push(url("https://other.org/")));
        assert_eq!(
            set.urls().iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://www.example.com/a", "https://other.org/"]
        );
    }

    #[test]
    fn test_push_respects_max() {
        let mut set = ResultSet::new(2);
        assert!(set.push(url("https://a.com/")));
        assert!(set.push(url("https://b.com/")));
        assert!(!set.push(url("https://c.com/")));
        assert!(set.is_full());
    }

    #[test]
    fn test_merge_seeds() {
        let mut set = ResultSet::new(3);
        set.push(url("https://a.com/"));
        let filter = ResultFilter::default();

        let seeds = vec![
            "https://www.a.com/dup".to_string(),
            "https://www.bing.com/search?q=x".to_string(),
            "https://b.com/#frag".to_string(),
            "https://c.com/".to_string(),
            "https://d.com/".to_string(),
        ];
        assert_eq!(set.merge_seeds(&seeds, &filter).unwrap(), 2);
        assert_eq!(
            set.urls().iter().map(Url::as_str).collect::<Vec<_>>(),
            vec!["https://a.com/", "https://b.com/", "https://c.com/"]
        );

        let bad = vec!["not a url".to_string()];
        assert_eq!(
            set.merge_seeds(&bad, &filter),
            Err(InputError::InvalidSeedUrl("not a url".to_string()))
        );
    }

    #[test]
    fn test_empty_query_rejected() {
        assert_eq!(SearchQuery::new("   "), Err(InputError::EmptyQuery));
        assert_eq!(SearchQuery::new(" seo ").unwrap().as_str(), "seo");
    }

    #[tokio::test]
    async fn test_twelve_links_nine_domains_in_rank_order() {
        let links = [
            "https://www.alpha.com/1",
            "https://beta.io/1",
            "https://alpha.com/2",
            "https://gamma.org/1",
            "https://delta.net/1",
            "https://news.beta.io/2",
            "https://epsilon.com/1",
            "https://zeta.com/1",
            "https://gamma.org/2",
            "https://eta.com/1",
            "https://theta.co.uk/1",
            "https://iota.dev/1",
        ];
        let fetcher = Arc::new(fetcher_with(
            &[(SearchEngine::Bing, bing_page(&links))],
            &links,
        ));
        let builder = builder(fetcher, vec![EngineAttempt::direct(SearchEngine::Bing)]);

        let set = builder.build(&query(), 10, 5).await.unwrap();
        assert_eq!(
            set.urls().iter().map(Url::as_str).collect::<Vec<_>>(),
            vec![
                "https://www.alpha.com/1",
                "https://beta.io/1",
                "https://gamma.org/1",
                "https://delta.net/1",
                "https://epsilon.com/1",
                "https://zeta.com/1",
                "https://eta.com/1",
                "https://theta.co.uk/1",
                "https://iota.dev/1",
            ]
        );

        let domains: HashSet<String> = set
            .iter()
            .map(|u| registrable_domain(u.host_str().unwrap()))
            .collect();
        assert_eq!(domains.len(), set.len());
    }

    #[tokio::test]
    async fn test_shortfall_falls_through_every_stage_and_merges() {
        let primary = ["https://a.com/1", "https://b.com/1", "https://a.com/2"];
        let secondary = ["https://b.com/2", "https://c.com/1"];
        let tertiary = ["https://c.com/2", "https://d.com/1", "https://e.com/1"];
        let all: Vec<&str> = primary
            .iter()
            .chain(secondary.iter())
            .chain(tertiary.iter())
            .copied()
            .collect();
        let fetcher = Arc::new(fetcher_with(
            &[
                (SearchEngine::Bing, bing_page(&primary)),
                (SearchEngine::DuckDuckGo, ddg_page(&secondary)),
            ],
            &all,
        ));
        let proxy = Arc::new(fetcher_with(&[(SearchEngine::Bing, bing_page(&tertiary))], &[]));
        let builder = builder(
            fetcher.clone(),
            vec![
                EngineAttempt::direct(SearchEngine::Bing),
                EngineAttempt::direct(SearchEngine::DuckDuckGo),
                EngineAttempt::proxied(SearchEngine::Bing),
                EngineAttempt::direct(SearchEngine::Google),
            ],
        )
        .with_proxy(proxy.clone());

        let set = builder.build(&query(), 10, 5).await.unwrap();
        assert_eq!(
            set.urls().iter().map(Url::as_str).collect::<Vec<_>>(),
            vec![
                "https://a.com/1",
                "https://b.com/1",
                "https://c.com/1",
                "https://d.com/1",
                "https://e.com/1",
            ]
        );

        let bing = SearchEngine::Bing.search_url("supply chain visibility");
        assert_eq!(fetcher.calls(bing.as_str()), 1);
        assert_eq!(proxy.calls(bing.as_str()), 1);
        // Minimum reached: the last attempt is never made
        let google = SearchEngine::Google.search_url("supply chain visibility");
        assert_eq!(fetcher.calls(google.as_str()), 0);
    }

    #[tokio::test]
    async fn test_enough_results_skips_fallbacks() {
        let links = ["https://a.com/", "https://b.com/"];
        let fetcher = Arc::new(fetcher_with(&[(SearchEngine::Bing, bing_page(&links))], &links));
        let builder = builder(
            fetcher.clone(),
            vec![
                EngineAttempt::direct(SearchEngine::Bing),
                EngineAttempt::direct(SearchEngine::DuckDuckGo),
            ],
        );

        let set = builder.build(&query(), 10, 2).await.unwrap();
        assert_eq!(set.len(), 2);
        let ddg = SearchEngine::DuckDuckGo.search_url("supply chain visibility");
        assert_eq!(fetcher.calls(ddg.as_str()), 0);
    }

    #[tokio::test]
    async fn test_all_engines_blocked_returns_empty_set() {
        let fetcher = Arc::new(FakeFetcher::new());
        let builder = builder(
            fetcher.clone(),
            vec![
                EngineAttempt::direct(SearchEngine::Bing),
                EngineAttempt::direct(SearchEngine::DuckDuckGo),
                EngineAttempt::proxied(SearchEngine::Google),
            ],
        );

        let set = builder.build(&query(), 10, 5).await.unwrap();
        assert!(set.is_empty());
        assert!(set.is_shortfall(5));
        // Each direct engine retried engine_retries (3) times; proxied one skipped
        let bing = SearchEngine::Bing.search_url("supply chain visibility");
        assert_eq!(fetcher.calls(bing.as_str()), 3);
        assert_eq!(fetcher.total_calls(), 6);
    }

    #[tokio::test]
    async fn test_unparseable_markup_counts_as_zero_results() {
        let fetcher = Arc::new(fetcher_with(
            &[(SearchEngine::Bing, "<html><body><div>captcha</div></body></html>".to_string())],
            &[],
        ));
        let builder = builder(fetcher, vec![EngineAttempt::direct(SearchEngine::Bing)]);
        let set = builder.build(&query(), 10, 5).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_bounds_rejected_before_network() {
        let fetcher = Arc::new(FakeFetcher::new());
        let builder = builder(fetcher.clone(), vec![EngineAttempt::direct(SearchEngine::Bing)]);
        assert!(builder.build(&query(), 0, 0).await.is_err());
        assert!(builder.build(&query(), 3, 5).await.is_err());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_proxied_attempt_uses_proxy_fetcher() {
        let links = ["https://a.com/"];
        let direct = Arc::new(fetcher_with(&[], &links));
        let proxy = Arc::new(fetcher_with(&[(SearchEngine::Google, {
            let items: String = links.iter().map(|l| format!(r#"<a href="{l}">r</a>"#)).collect();
            format!(r#"<a href="/preferences">prefs</a>{items}"#)
        })], &[]));
        let resolver = Arc::new(RedirectResolver::new(direct.clone(), Arc::new(ResultFilter::default())));
        let config = SearchConfig {
            engines: vec![EngineAttempt::proxied(SearchEngine::Google)],
            ..SearchConfig::default()
        };
        let builder = ResultSetBuilder::new(direct, resolver, config).with_proxy(proxy.clone());

        let set = builder.build(&query(), 10, 1).await.unwrap();
        assert_eq!(set.urls(), &[url("https://a.com/")]);
        let google = SearchEngine::Google.search_url("supply chain visibility");
        assert_eq!(proxy.calls(google.as_str()), 1);
    }
}
