use std::net::IpAddr;

/// Second-level labels under which registrations happen one level deeper,
/// e.g. `bbc.co.uk` rather than `co.uk`.
const SECOND_LEVEL_SUFFIXES: [&str; 10] = ["co", "com", "net", "org", "gov", "ac", "edu", "ne", "or", "gob"];

/// Derive the registrable domain used as the per-result deduplication key.
///
/// Subdomains are ignored (`blog.example.com` -> `example.com`). Country-code
/// hosts with a common second-level suffix keep three labels
/// (`news.bbc.co.uk` -> `bbc.co.uk`). IP addresses are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&second) {
        3
    } else {
        2
    };

    labels[labels.len() - keep..].join(".")
}

/// Convert a search query into a filesystem-safe file stem
pub fn sanitize_filename(query: &str) -> String {
    let mut name: String = query
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '&' | '=' | '#' | '%' | '*' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    if name.chars().count() > 100 {
        name = name.chars().take(100).collect();
    }
    name
}
