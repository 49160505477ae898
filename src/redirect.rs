use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::filter::ResultFilter;
use crate::parsers::html::redirect_hints;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use std::sync::Arc;
use url::Url;

/// Tracking-wrapper families we can decode without a network call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WrapperKind {
    /// `bing.com/ck/a?...&u=a1<base64url destination>`
    Bing,
    /// `duckduckgo.com/l/?uddg=<percent-encoded destination>`
    DuckDuckGo,
    /// `google.*/url?q=<destination>` (or `url=`)
    Google,
}

fn wrapper_kind(url: &Url) -> Option<WrapperKind> {
    let host = url.host_str()?.to_ascii_lowercase();
    let path = url.path();

    if (host == "bing.com" || host.ends_with(".bing.com")) && path == "/ck/a" {
        Some(WrapperKind::Bing)
    } else if (host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"))
        && path.starts_with("/l/")
    {
        Some(WrapperKind::DuckDuckGo)
    } else if (host.starts_with("google.") || host.contains(".google.")) && path == "/url" {
        Some(WrapperKind::Google)
    } else {
        None
    }
}

/// Whether the URL matches a known search-engine tracking wrapper
pub fn is_tracking_wrapper(url: &Url) -> bool {
    wrapper_kind(url).is_some()
}

/// Decode the destination embedded in a tracking wrapper's query string
pub fn decode_wrapper(url: &Url) -> Option<Url> {
    let kind = wrapper_kind(url)?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    let destination = match kind {
        WrapperKind::Bing => decode_bing_target(&param("u")?)?,
        WrapperKind::DuckDuckGo => param("uddg")?,
        WrapperKind::Google => param("q").or_else(|| param("url"))?,
    };

    let decoded = Url::parse(destination.trim()).ok()?;
    if decoded.scheme() == "http" || decoded.scheme() == "https" {
        Some(decoded)
    } else {
        None
    }
}

/// Bing prefixes the base64 destination with a two-character version tag
fn decode_bing_target(value: &str) -> Option<String> {
    let encoded = value.strip_prefix("a1").unwrap_or(value);
    let encoded = encoded.trim_end_matches('=');

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .ok()?;
    String::from_utf8(bytes).ok()
}

/// Turns raw search-result links into canonical destination URLs.
///
/// Structural decoding is tried first for known wrappers. Otherwise the
/// link is fetched (following HTTP redirects) and the document is inspected
/// for a canonical link, then a meta refresh, then the final HTTP URL.
/// Results on blocked hosts (engines, proxies) are rejected. Network
/// failures resolve to `None`; this never errors.
pub struct RedirectResolver {
    direct: Arc<dyn Fetcher>,
    proxy: Option<Arc<dyn Fetcher>>,
    filter: Arc<ResultFilter>,
}

impl RedirectResolver {
    pub fn new(direct: Arc<dyn Fetcher>, filter: Arc<ResultFilter>) -> Self {
        Self {
            direct,
            proxy: None,
            filter,
        }
    }

    /// Use the proxy as a second chance for wrappers a direct fetch can't escape
    pub fn with_proxy(mut self, proxy: Arc<dyn Fetcher>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Resolve a candidate link to its canonical destination, if any
    pub async fn resolve(&self, link: &str) -> Option<Url> {
        let url = match Url::parse(link.trim()) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url,
            _ => {
                ::log::debug!("Dropping unparseable candidate: {}", link);
                return None;
            }
        };

        let wrapper = is_tracking_wrapper(&url);
        if wrapper {
            if let Some(destination) = decode_wrapper(&url).and_then(|d| self.accept(&d)) {
                ::log::debug!("Decoded wrapper {} -> {}", link, destination);
                return Some(destination);
            }
        }

        if let Some(resolved) = self.resolve_via(self.direct.as_ref(), &url, false).await {
            ::log::debug!("Resolved {} -> {}", link, resolved);
            return Some(resolved);
        }

        if wrapper {
            if let Some(proxy) = &self.proxy {
                let resolved = self.resolve_via(proxy.as_ref(), &url, true).await;
                ::log::debug!("Resolved {} via {} -> {:?}", link, proxy.name(), resolved);
                return resolved;
            }
        }

        ::log::debug!("Could not resolve {}", link);
        None
    }

    /// Fetch `url` and pick the first acceptable destination in precedence
    /// order: canonical, meta refresh, final HTTP URL, then (optionally) the
    /// first outbound anchor. A non-2xx answer keeps `url` itself; timeouts
    /// and connection failures resolve to nothing.
    async fn resolve_via(&self, fetcher: &dyn Fetcher, url: &Url, use_anchors: bool) -> Option<Url> {
        let page = match fetcher.fetch(url.as_str()).await {
            Ok(page) => page,
            // The host answered, so the link itself is real even if the page
            // is bot-protected or errored; the scraper gets its own chance later
            Err(FetchError::Status(code)) => {
                ::log::debug!("{} got status {} for {}; keeping the link", fetcher.name(), code, url);
                return self.accept(url);
            }
            Err(e) => {
                ::log::debug!("{} could not fetch {}: {}", fetcher.name(), url, e);
                return None;
            }
        };

        let final_url = Url::parse(&page.final_url).unwrap_or_else(|_| url.clone());
        let hints = redirect_hints(&page.body);

        let mut candidates: Vec<Url> = Vec::new();
        candidates.extend(hints.canonical.and_then(|c| final_url.join(&c).ok()));
        candidates.extend(hints.meta_refresh.and_then(|m| final_url.join(&m).ok()));
        candidates.push(final_url.clone());
        if use_anchors {
            candidates.extend(hints.anchors.iter().filter_map(|a| final_url.join(a).ok()));
        }

        candidates.iter().find_map(|candidate| self.accept(candidate))
    }

    fn accept(&self, url: &Url) -> Option<Url> {
        if self.filter.accepts(url) {
            Some(self.filter.normalize_url(url))
        } else {
            None
        }
    }
}
