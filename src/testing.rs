//! In-memory fetcher used by unit tests; never touches the network.

use crate::error::FetchError;
use crate::fetchers::{FetchedPage, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
enum Scripted {
    Page { final_url: String, body: String },
    Status(u16),
    Timeout,
    /// Fails with 503 this many times, then serves the page
    Flaky { failures: u32, body: String },
}

#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.add_page(url, body);
        self
    }

    pub fn with_redirect(self, url: &str, final_url: &str, body: &str) -> Self {
        self.script(
            url,
            Scripted::Page {
                final_url: final_url.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_failure(self, url: &str, status: u16) -> Self {
        self.script(url, Scripted::Status(status));
        self
    }

    pub fn with_timeout(self, url: &str) -> Self {
        self.script(url, Scripted::Timeout);
        self
    }

    pub fn with_flaky(self, url: &str, failures: u32, body: &str) -> Self {
        self.script(
            url,
            Scripted::Flaky {
                failures,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn add_page(&self, url: &str, body: &str) {
        self.script(
            url,
            Scripted::Page {
                final_url: url.to_string(),
                body: body.to_string(),
            },
        );
    }

    fn script(&self, url: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let scripted = self.responses.lock().unwrap().get(url).cloned();
        match scripted {
            Some(Scripted::Page { final_url, body }) => Ok(FetchedPage::new(final_url, body)),
            Some(Scripted::Status(status)) => Err(FetchError::Status(status)),
            Some(Scripted::Timeout) => Err(FetchError::Timeout(Duration::from_secs(10))),
            Some(Scripted::Flaky { failures, body }) if call > failures => {
                Ok(FetchedPage::new(url, body))
            }
            Some(Scripted::Flaky { .. }) => Err(FetchError::Status(503)),
            None => Err(FetchError::Status(404)),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}
