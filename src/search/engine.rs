use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Search engines whose result pages we know how to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Bing,
    #[serde(alias = "ddg")]
    DuckDuckGo,
    Google,
}

impl SearchEngine {
    /// Base URL that relative result links are resolved against
    pub fn base_url(&self) -> &'static str {
        match self {
            SearchEngine::Bing => "https://www.bing.com/",
            SearchEngine::DuckDuckGo => "https://duckduckgo.com/",
            SearchEngine::Google => "https://www.google.com/",
        }
    }

    /// CSS selector for organic result anchors
    pub fn result_selector(&self) -> &'static str {
        match self {
            SearchEngine::Bing => "li.b_algo h2 a",
            SearchEngine::DuckDuckGo => "a.result__a",
            SearchEngine::Google => "a[href]",
        }
    }

    /// Results page URL for a query
    pub fn search_url(&self, query: &str) -> Url {
        let endpoint = match self {
            SearchEngine::Bing => "https://www.bing.com/search",
            SearchEngine::DuckDuckGo => "https://html.duckduckgo.com/html/",
            SearchEngine::Google => "https://www.google.com/search",
        };
        // The endpoints are constants, so parsing cannot fail
        Url::parse_with_params(endpoint, &[("q", query)]).expect("valid search endpoint")
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchEngine::Bing => "bing",
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Google => "google",
        };
        f.write_str(name)
    }
}

/// One step in the engine fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineAttempt {
    pub engine: SearchEngine,

    /// Query the engine through the proxy/rendering service
    #[serde(default)]
    pub via_proxy: bool,
}

impl EngineAttempt {
    pub fn direct(engine: SearchEngine) -> Self {
        Self {
            engine,
            via_proxy: false,
        }
    }

    pub fn proxied(engine: SearchEngine) -> Self {
        Self {
            engine,
            via_proxy: true,
        }
    }
}

impl fmt::Display for EngineAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.via_proxy {
            write!(f, "{} (via proxy)", self.engine)
        } else {
            write!(f, "{}", self.engine)
        }
    }
}
