use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A heading as it appeared in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 through 4
    pub level: u8,

    /// Trimmed, whitespace-normalised text; never empty
    pub text: String,
}

/// Structured data extracted from one fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// URL of the page as submitted to the scraper
    pub url: String,

    /// Text of the first `<title>`; empty when the page has none
    pub title: String,

    /// Meta description (or og:description); empty when the page has none
    pub meta_description: String,

    /// Headings in document order
    pub headings: Vec<Heading>,

    /// `@type` values found in JSON-LD blocks
    pub structured_data_types: BTreeSet<String>,
}

/// Why a URL could not be scraped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Network(String),
    Status(u16),
    Timeout,
    NotHtml(String),
    /// The scrape task itself died before reporting
    Aborted(String),
}

impl From<&FetchError> for FailureReason {
    fn from(error: &FetchError) -> Self {
        match error {
            FetchError::Status(code) => FailureReason::Status(*code),
            FetchError::Timeout(_) => FailureReason::Timeout,
            FetchError::Http(e) if e.is_timeout() => FailureReason::Timeout,
            FetchError::NotHtml(content_type) => FailureReason::NotHtml(content_type.clone()),
            other => FailureReason::Network(other.to_string()),
        }
    }
}

/// Terminal failure for one URL after all attempts were used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeFailure {
    pub attempts: u32,
    pub reason: FailureReason,
}

/// Either a page record or a terminal failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Scraped(PageRecord),
    Failed(ScrapeFailure),
}

impl ScrapeOutcome {
    pub fn page(&self) -> Option<&PageRecord> {
        match self {
            ScrapeOutcome::Scraped(page) => Some(page),
            ScrapeOutcome::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ScrapeOutcome::Failed(_))
    }
}

/// URL -> outcome for every URL submitted to the batch scraper.
///
/// Keyed by URL; callers re-associate results by key, never by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrapeBatchResult {
    entries: BTreeMap<String, ScrapeOutcome>,
}

impl ScrapeBatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `url`; returns false if it was already recorded
    pub fn insert(&mut self, url: String, outcome: ScrapeOutcome) -> bool {
        if self.entries.contains_key(&url) {
            ::log::warn!("Duplicate scrape outcome for {} ignored", url);
            return false;
        }
        self.entries.insert(url, outcome);
        true
    }

    pub fn get(&self, url: &str) -> Option<&ScrapeOutcome> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScrapeOutcome)> {
        self.entries.iter()
    }

    /// Successfully scraped pages
    pub fn pages(&self) -> impl Iterator<Item = &PageRecord> {
        self.entries.values().filter_map(ScrapeOutcome::page)
    }

    /// URLs that failed, with their failure
    pub fn failures(&self) -> impl Iterator<Item = (&String, &ScrapeFailure)> {
        self.entries.iter().filter_map(|(url, outcome)| match outcome {
            ScrapeOutcome::Failed(failure) => Some((url, failure)),
            ScrapeOutcome::Scraped(_) => None,
        })
    }

    pub fn success_count(&self) -> usize {
        self.pages().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}
