use crate::config::ResolverConfig;
use regex::Regex;
use url::Url;

/// Assets and known tracking-wrapper paths
pub fn default_exclude_patterns() -> Vec<String> {
    vec![
        r"(?i)\.(jpg|jpeg|png|gif|css|js|ico|svg|woff|woff2|ttf|eot|zip|mp4|mp3)$".to_string(),
        r"^https?://[^/]+/ck/a\?".to_string(),
        r"^https?://[^/]+/aclk\?".to_string(),
        r"^https?://([^/]+\.)?google\.[^/]+/url\?".to_string(),
        r"^https?://[^/]+/l/\?uddg=".to_string(),
    ]
}

/// Rejects URLs that are not real, fetchable search results
#[derive(Debug)]
pub struct ResultFilter {
    blocked_hosts: Vec<String>,
    exclude_regexes: Vec<Regex>,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl ResultFilter {
    /// Create a new filter from blocked hosts and exclude patterns
    pub fn new<I, S>(blocked_hosts: I, exclude_patterns: &[String]) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut exclude_regexes = Vec::with_capacity(exclude_patterns.len());
        for pattern in exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        let mut filter = Self {
            blocked_hosts: Vec::new(),
            exclude_regexes,
        };
        for host in blocked_hosts {
            filter.block_host(host.as_ref());
        }
        Ok(filter)
    }

    /// Filter described by the resolver section of the configuration
    pub fn from_config(config: &ResolverConfig) -> Result<Self, regex::Error> {
        Self::new(&config.blocked_hosts, &config.exclude_patterns)
    }

    /// Add another host to the block list (e.g. the configured proxy)
    pub fn block_host(&mut self, host: &str) {
        let host = host.trim().trim_start_matches("www.").to_ascii_lowercase();
        if !host.is_empty() && !self.blocked_hosts.contains(&host) {
            self.blocked_hosts.push(host);
        }
    }

    /// Determine if a URL may appear in a result set
    pub fn accepts(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let Some(host) = url.host_str() else {
            return false;
        };
        if self.is_blocked_host(host) {
            return false;
        }

        let url_str = url.as_str();
        !self.exclude_regexes.iter().any(|regex| regex.is_match(url_str))
    }

    /// Whether `host` is a blocked host or a subdomain of one
    pub fn is_blocked_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.blocked_hosts
            .iter()
            .any(|blocked| host == *blocked || host.ends_with(&format!(".{blocked}")))
    }

    /// Create a normalized version of the URL (fragments removed)
    pub fn normalize_url(&self, url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        normalized
    }
}
