//! Hand-off contract for the external summarizer.
//!
//! A summarizer turns one scraped page plus the search keyword into
//! free-text insight for a writer. No model client lives in this crate;
//! callers supply their own implementation.

use crate::results::{Heading, PageRecord, ScrapeBatchResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Text used when a summarizer call fails
pub const FALLBACK_INSIGHT: &str = "No insight generated.";

#[derive(Debug, Error)]
#[error("Summarizer error: {0}")]
pub struct SummaryError(pub String);

/// What a summarizer receives; only ever built from a successful page record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRequest {
    pub keyword: String,
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<Heading>,
}

impl SummaryRequest {
    pub fn from_page(keyword: &str, page: &PageRecord) -> Self {
        Self {
            keyword: keyword.to_string(),
            url: page.url.clone(),
            title: page.title.clone(),
            meta_description: page.meta_description.clone(),
            headings: page.headings.clone(),
        }
    }
}

/// Per-page insight returned to the brief layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub url: String,
    pub title: String,
    pub text: String,
    /// False when `text` is the fallback because the summarizer failed
    pub generated: bool,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError>;
}

/// Summarize every successfully scraped page, in URL order.
///
/// Failed scrapes are never handed to the summarizer. A failed summarizer
/// call yields the fallback insight rather than an error.
pub async fn summarize_batch(
    summarizer: &dyn Summarizer,
    keyword: &str,
    batch: &ScrapeBatchResult,
) -> BTreeMap<String, Insight> {
    let mut insights = BTreeMap::new();

    for page in batch.pages() {
        let request = SummaryRequest::from_page(keyword, page);
        let (text, generated) = match summarizer.summarize(&request).await {
            Ok(text) => (text.trim().to_string(), true),
            Err(e) => {
                ::log::warn!("Summarizer failed for {}: {}", page.url, e);
                (FALLBACK_INSIGHT.to_string(), false)
            }
        };

        insights.insert(
            page.url.clone(),
            Insight {
                url: page.url.clone(),
                title: page.title.clone(),
                text,
                generated,
            },
        );
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FailureReason, ScrapeFailure, ScrapeOutcome};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<SummaryRequest>>,
    }

    #[async_trait]
    impl Summarizer for Recording {
        async fn summarize(&self, request: &SummaryRequest) -> Result<String, SummaryError> {
            self.seen.lock().unwrap().push(request.clone());
            if request.title.is_empty() {
                Err(SummaryError("empty title".into()))
            } else {
                Ok(format!("  TLDR for {}  ", request.title))
            }
        }
    }

    fn page(url: &str, title: &str) -> ScrapeOutcome {
        ScrapeOutcome::Scraped(PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            meta_description: String::new(),
            headings: vec![Heading {
                level: 1,
                text: "H".into(),
            }],
            structured_data_types: BTreeSet::new(),
        })
    }

    #[tokio::test]
    async fn test_only_successful_pages_are_summarized() {
        let mut batch = ScrapeBatchResult::new();
        batch.insert("https://a.com/".into(), page("https://a.com/", "Alpha"));
        batch.insert("https://b.com/".into(), page("https://b.com/", ""));
        batch.insert(
            "https://c.com/".into(),
            ScrapeOutcome::Failed(ScrapeFailure {
                attempts: 3,
                reason: FailureReason::Timeout,
            }),
        );

        let summarizer = Recording {
            seen: Mutex::new(Vec::new()),
        };
        let insights = summarize_batch(&summarizer, "seo", &batch).await;

        assert_eq!(summarizer.seen.lock().unwrap().len(), 2);
        assert_eq!(insights.len(), 2);
        assert_eq!(insights["https://a.com/"].text, "TLDR for Alpha");
        assert!(insights["https://a.com/"].generated);
        assert_eq!(insights["https://b.com/"].text, FALLBACK_INSIGHT);
        assert!(!insights["https://b.com/"].generated);
        assert_eq!(summarizer.seen.lock().unwrap()[0].keyword, "seo");
    }
}
