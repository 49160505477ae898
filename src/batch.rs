use crate::fetchers::Fetcher;
use crate::fetchers::retry::RetryPolicy;
use crate::parsers::html;
use crate::results::{FailureReason, ScrapeBatchResult, ScrapeFailure, ScrapeOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinSet;
use url::Url;

/// Fetches and extracts a list of URLs in bounded-concurrency batches.
///
/// Within a batch every URL is fetched concurrently; batches run one after
/// another so at most `concurrency` requests are in flight. Each URL is
/// retried under the retry policy and ends up in the result exactly once,
/// either as a page record or as a failure. One URL failing (or its task
/// panicking) never affects its siblings.
pub struct BatchScraper {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
    concurrency: usize,
}

impl BatchScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, concurrency: usize, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Scrape every distinct URL in `urls`.
    ///
    /// Output is keyed by URL; completion order is not preserved.
    pub async fn scrape_all(&self, urls: &[Url]) -> ScrapeBatchResult {
        let mut seen = HashSet::new();
        let urls: Vec<Url> = urls
            .iter()
            .filter(|url| seen.insert(url.as_str().to_string()))
            .cloned()
            .collect();

        let total = urls.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let mut results = ScrapeBatchResult::new();

        ::log::info!(
            "Scraping {} URLs with concurrency {} via {}",
            total,
            self.concurrency,
            self.fetcher.name()
        );

        for (batch_index, batch) in urls.chunks(self.concurrency).enumerate() {
            ::log::debug!("Starting batch {} ({} URLs)", batch_index + 1, batch.len());

            let mut tasks = JoinSet::new();
            for url in batch {
                let fetcher = Arc::clone(&self.fetcher);
                let policy = self.policy;
                let completed = Arc::clone(&completed);
                let url = url.clone();

                tasks.spawn(async move {
                    let outcome = scrape_one(fetcher.as_ref(), &policy, &url).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    ::log::info!("Scraped {}/{}: {}", done, total, url);
                    (url.to_string(), outcome)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((url, outcome)) => {
                        results.insert(url, outcome);
                    }
                    Err(e) => ::log::error!("Scrape task aborted: {}", e),
                }
            }

            // A panicked task never reported back; record it so no URL goes missing
            for url in batch {
                if !results.contains(url.as_str()) {
                    results.insert(
                        url.to_string(),
                        ScrapeOutcome::Failed(ScrapeFailure {
                            attempts: 0,
                            reason: FailureReason::Aborted("scrape task did not complete".into()),
                        }),
                    );
                }
            }
        }

        ::log::info!(
            "Scraping complete: {} pages, {} failures",
            results.success_count(),
            results.failure_count()
        );
        results
    }
}

/// Fetch and extract one URL under the retry policy
async fn scrape_one(fetcher: &dyn Fetcher, policy: &RetryPolicy, url: &Url) -> ScrapeOutcome {
    let label = format!("Fetch of {url}");
    match policy.run(&label, |_| fetcher.fetch(url.as_str())).await {
        Ok(page) => ScrapeOutcome::Scraped(html::extract(&page.body, url)),
        Err(exhausted) => {
            ::log::error!(
                "Giving up on {} after {} attempts: {}",
                url,
                exhausted.attempts,
                exhausted.last_error
            );
            ScrapeOutcome::Failed(ScrapeFailure {
                attempts: exhausted.attempts,
                reason: FailureReason::from(&exhausted.last_error),
            })
        }
    }
}
