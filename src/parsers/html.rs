use crate::parsers::{collapse_whitespace, element_text};
use crate::results::{Heading, PageRecord};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());
static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static SCRIPTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("link[href]").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Parses fetched HTML into a page record.
///
/// Pure parsing: never touches the network and never fails. Missing or
/// malformed parts degrade to empty values.
pub fn extract(html: &str, source_url: &Url) -> PageRecord {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let meta_description = extract_meta_description(&doc);
    let headings = extract_headings(&doc);
    let structured_data_types = extract_structured_data_types(&doc);

    ::log::trace!(
        "Extracted {} headings and {} structured data types from {}",
        headings.len(),
        structured_data_types.len(),
        source_url
    );

    PageRecord {
        url: source_url.to_string(),
        title,
        meta_description,
        headings,
        structured_data_types,
    }
}

/// Text of the first `<title>`, or empty
fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

/// `<meta name="description">`, falling back to `<meta property="og:description">`
fn extract_meta_description(doc: &Html) -> String {
    meta_content(doc, "name", "description")
        .or_else(|| meta_content(doc, "property", "og:description"))
        .unwrap_or_default()
}

/// Content of the first meta tag whose `attr` equals `value` (case-insensitive).
/// A tag without usable content counts as absent.
fn meta_content(doc: &Html, attr: &str, value: &str) -> Option<String> {
    doc.select(&META)
        .filter(|meta| {
            meta.value()
                .attr(attr)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value))
        })
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty())
}

/// Every h1-h4 in document order; empty headings are dropped
fn extract_headings(doc: &Html) -> Vec<Heading> {
    doc.select(&HEADINGS)
        .filter_map(|el| {
            let level = heading_level(&el)?;
            let text = element_text(el);
            if text.is_empty() {
                None
            } else {
                Some(Heading { level, text })
            }
        })
        .collect()
}

fn heading_level(el: &ElementRef) -> Option<u8> {
    match el.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        _ => None,
    }
}

/// Every `@type` found in parseable JSON-LD blocks. Malformed blocks are skipped.
fn extract_structured_data_types(doc: &Html) -> BTreeSet<String> {
    let mut types = BTreeSet::new();

    for script in doc.select(&SCRIPTS) {
        let is_json_ld = script
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if !is_json_ld {
            continue;
        }

        let json_text = script.text().collect::<String>();
        match serde_json::from_str::<serde_json::Value>(&json_text) {
            Ok(value) => collect_types(&value, &mut types),
            Err(e) => ::log::debug!("Skipping malformed JSON-LD block: {}", e),
        }
    }

    types
}

/// Walk the JSON-LD tree (including `@graph` and nested entities) collecting `@type`
fn collect_types(value: &serde_json::Value, types: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                if key == "@type" {
                    match val {
                        serde_json::Value::String(s) => {
                            insert_type(s, types);
                        }
                        serde_json::Value::Array(items) => {
                            for item in items.iter().filter_map(|i| i.as_str()) {
                                insert_type(item, types);
                            }
                        }
                        _ => {}
                    }
                } else {
                    collect_types(val, types);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_types(item, types);
            }
        }
        _ => {}
    }
}

fn insert_type(value: &str, types: &mut BTreeSet<String>) {
    let value = value.trim();
    if !value.is_empty() {
        types.insert(value.to_string());
    }
}

/// Redirect-relevant markers found in a fetched document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectHints {
    /// `href` of `<link rel="canonical">`
    pub canonical: Option<String>,
    /// Target of `<meta http-equiv="refresh" content="0; url=...">`
    pub meta_refresh: Option<String>,
    /// Every anchor `href`, in document order
    pub anchors: Vec<String>,
}

/// Collect canonical, meta-refresh and anchor targets from a document
pub fn redirect_hints(html: &str) -> RedirectHints {
    let doc = Html::parse_document(html);

    let canonical = doc
        .select(&LINKS)
        .filter(|link| {
            link.value().attr("rel").is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("canonical"))
            })
        })
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_string);

    let meta_refresh = doc
        .select(&META)
        .filter(|meta| {
            meta.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"))
        })
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(parse_refresh_target);

    let anchors = doc
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect();

    RedirectHints {
        canonical,
        meta_refresh,
        anchors,
    }
}

/// Parse the URL out of a refresh directive such as `5; URL='https://x.com/'`
fn parse_refresh_target(content: &str) -> Option<String> {
    let lower = content.to_ascii_lowercase();
    let idx = lower.find("url=")?;
    let target = content[idx + 4..]
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim();
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("http://example.com").unwrap()
    }

    #[test]
    fn test_title_without_meta() {
        let record = extract("<html><head><title>Foo</title></head><body></body></html>", &source());
        assert_eq!(record.title, "Foo");
        assert_eq!(record.meta_description, "");
        assert!(record.headings.is_empty());
        assert!(record.structured_data_types.is_empty());
        assert_eq!(record.url, "http://example.com/");
    }

    #[test]
    fn test_title_is_trimmed_and_first_wins() {
        let html = "<title>\n   Spaced   Title \n</title><title>Second</title>";
        assert_eq!(extract(html, &source()).title, "Spaced Title");
    }

    #[test]
    fn test_og_description_fallback() {
        let html = r#"<head><meta property="og:description" content="From OG"></head>"#;
        assert_eq!(extract(html, &source()).meta_description, "From OG");

        let html = r#"<head>
            <meta property="og:description" content="From OG">
            <meta name="Description" content=" Primary ">
        </head>"#;
        assert_eq!(extract(html, &source()).meta_description, "Primary");
    }

    #[test]
    fn test_empty_meta_description_falls_through() {
        let html = r#"<meta name="description" content="  "><meta property="og:description" content="OG">"#;
        assert_eq!(extract(html, &source()).meta_description, "OG");
    }

    #[test]
    fn test_nested_heading_text_and_empty_headings() {
        let html = "<h2>  <span>Nested</span>\n <em>text</em> </h2><h3>   </h3><h5>Ignored</h5>";
        let record = extract(html, &source());
        assert_eq!(
            record.headings,
            vec![Heading {
                level: 2,
                text: "Nested text".to_string()
            }]
        );
    }

    #[test]
    fn test_json_ld_graph_and_arrays() {
        let html = r#"
            <script type="application/ld+json">
                {"@context": "https://schema.org", "@graph": [
                    {"@type": "Organization", "name": "X"},
                    {"@type": ["WebPage", "FAQPage"], "author": {"@type": "Person"}}
                ]}
            </script>
            <script type="application/ld+json">[{"@type": "BreadcrumbList"}]</script>
        "#;
        let types: Vec<String> = extract(html, &source())
            .structured_data_types
            .into_iter()
            .collect();
        assert_eq!(
            types,
            vec!["BreadcrumbList", "FAQPage", "Organization", "Person", "WebPage"]
        );
    }

    #[test]
    fn test_malformed_json_ld_is_skipped() {
        let html = r#"
            <title>Still here</title>
            <script type="application/ld+json">{ "@type": "Article", </script>
            <script type="application/ld+json">{"@type": "HowTo"}</script>
            <script type="text/javascript">{"@type": "NotStructuredData"}</script>
        "#;
        let record = extract(html, &source());
        assert_eq!(record.title, "Still here");
        assert_eq!(
            record.structured_data_types.into_iter().collect::<Vec<_>>(),
            vec!["HowTo".to_string()]
        );
    }

    #[test]
    fn test_redirect_hints() {
        let html = r#"
            <head>
                <meta http-equiv="Refresh" content="0; URL='https://dest.example/page'">
                <link rel="canonical" href="https://canon.example/page">
            </head>
            <body><a href="/local">x</a><a href=" https://other.example/ ">y</a></body>
        "#;
        let hints = redirect_hints(html);
        assert_eq!(hints.canonical.as_deref(), Some("https://canon.example/page"));
        assert_eq!(hints.meta_refresh.as_deref(), Some("https://dest.example/page"));
        assert_eq!(hints.anchors, vec!["/local", "https://other.example/"]);
    }

    #[test]
    fn test_refresh_without_url() {
        assert_eq!(parse_refresh_target("30"), None);
        assert_eq!(parse_refresh_target("0;url="), None);
        assert_eq!(
            parse_refresh_target("0;url=https://a.example/"),
            Some("https://a.example/".to_string())
        );
    }
}
