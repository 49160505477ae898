use crate::error::FetchError;
use crate::fetchers::fetcher::{FetchedPage, Fetcher};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Common local WebDriver endpoints tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444",
];

/// Renders pages in a real browser through a WebDriver session.
///
/// Used for pages that only produce their headings after JavaScript runs.
/// A single session is opened lazily and reused; fetches through it are
/// serialised because one session drives one tab.
pub struct WebDriverFetcher {
    webdriver_url: String,
    timeout: Duration,
    session: Mutex<Option<Client>>,
}

impl WebDriverFetcher {
    pub fn new(webdriver_url: &str, timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            timeout,
            session: Mutex::new(None),
        }
    }

    /// Connects to the configured WebDriver, then to the common fallbacks
    async fn connect(&self) -> Result<Client, FetchError> {
        match ClientBuilder::native().connect(&self.webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::warn!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
            }
        }

        for url in FALLBACK_WEBDRIVER_URLS
            .iter()
            .filter(|url| **url != self.webdriver_url)
        {
            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = ClientBuilder::native().connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        Err(FetchError::Render(format!(
            "no WebDriver server reachable at {} (set WEBDRIVER_URL)",
            self.webdriver_url
        )))
    }

    async fn render(&self, client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
        client
            .goto(url)
            .await
            .map_err(|e| FetchError::Render(format!("navigating to {url}: {e}")))?;

        let body = client
            .source()
            .await
            .map_err(|e| FetchError::Render(format!("reading source of {url}: {e}")))?;

        let final_url = client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string());

        Ok(FetchedPage::new(final_url, body))
    }

    /// Close the session if one was opened
    pub async fn close(&self) {
        if let Some(client) = self.session.lock().await.take() {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

#[async_trait]
impl Fetcher for WebDriverFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();
        let mut session = self.session.lock().await;

        if session.is_none() {
            *session = Some(self.connect().await?);
        }
        let client = match session.as_ref() {
            Some(client) => client.clone(),
            None => return Err(FetchError::Render("WebDriver session unavailable".to_string())),
        };

        let result = match timeout(self.timeout, self.render(&client, url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        match &result {
            Ok(page) => ::log::debug!(
                "Rendered {} ({} bytes) in {:.2} seconds",
                url,
                page.body.len(),
                start.elapsed().as_secs_f64()
            ),
            Err(e) if e.to_string().contains("Unable to find session") => {
                // A dead session is dropped so the next attempt reconnects
                ::log::warn!("Lost WebDriver session while rendering {}", url);
                *session = None;
            }
            Err(_) => {}
        }

        result
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}
