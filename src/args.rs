use clap::Parser;
use serp_brief::PipelineConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "serp-brief")]
#[command(about = "Discover top search results for a keyword and scrape their page structure")]
#[command(version)]
pub struct Args {
    /// Keyword or phrase to search for
    pub query: String,

    /// Maximum number of result URLs to keep
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Fewer results than this is reported as a shortfall
    #[arg(long)]
    pub min_results: Option<usize>,

    /// Number of pages scraped concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Total fetch attempts per page
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Request timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// URL merged into the results when engines come up short (repeatable)
    #[arg(long = "seed-url")]
    pub seed_urls: Vec<String>,

    /// Render pages through a WebDriver server instead of plain HTTP
    #[arg(long)]
    pub webdriver: bool,

    /// JSON configuration file
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Report path (defaults to <query>_brief.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report to stdout instead of writing a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

impl Args {
    /// Fold flag overrides into a loaded configuration
    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(value) = self.max_results {
            config.search.max_results = value;
        }
        if let Some(value) = self.min_results {
            config.search.min_results = value;
        }
        if let Some(value) = self.concurrency {
            config.scrape.concurrency = value;
        }
        if let Some(value) = self.retries {
            config.scrape.retry.max_attempts = value;
        }
        if let Some(seconds) = self.timeout {
            config.scrape.timeout_secs = seconds;
            config.resolver.timeout_secs = seconds;
            config.http.timeout_secs = seconds;
        }
        if self.webdriver {
            config.scrape.use_webdriver = true;
        }
        config
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}_brief.json",
                serp_brief::utils::sanitize_filename(&self.query)
            ))
        })
    }
}
