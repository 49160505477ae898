use crate::search::engine::SearchEngine;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extract organic result links from a search results page, in rank order.
///
/// Relative and protocol-relative hrefs are made absolute against the
/// engine's base URL. Links are returned as-is otherwise: tracking wrappers
/// are left for the redirect resolver. Markup drift yields an empty list,
/// never an error.
pub fn extract_links(html: &str, engine: SearchEngine) -> Vec<String> {
    let doc = Html::parse_document(html);
    let selector = match Selector::parse(engine.result_selector()) {
        Ok(selector) => selector,
        Err(e) => {
            ::log::error!("Invalid result selector for {}: {:?}", engine, e);
            return Vec::new();
        }
    };
    let Ok(base) = Url::parse(engine.base_url()) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let links: Vec<String> = doc
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .filter(|url| keep_candidate(engine, url))
        .map(|url| url.to_string())
        .filter(|link| seen.insert(link.clone()))
        .collect();

    ::log::debug!("{} results page yielded {} candidate links", engine, links.len());
    links
}

/// Google's generic anchor selector also matches navigation; keep only
/// outbound links and its `/url?` wrappers
fn keep_candidate(engine: SearchEngine, url: &Url) -> bool {
    match engine {
        SearchEngine::Google => {
            let host = url.host_str().unwrap_or_default();
            let is_google = host.starts_with("google.") || host.contains(".google.");
            !is_google || url.path() == "/url"
        }
        SearchEngine::Bing | SearchEngine::DuckDuckGo => true,
    }
}
