//! Search engine result discovery and page scraping.
//!
//! Given a keyword, query a chain of search engines, resolve tracking
//! redirects, keep at most one result per registrable domain and scrape the
//! surviving pages for their title, meta description, headings and
//! structured data types.

pub mod batch;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod outline;
pub mod parsers;
pub mod pipeline;
pub mod redirect;
pub mod results;
pub mod search;
pub mod summarizer;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use config::PipelineConfig;
pub use error::{FetchError, InputError, PipelineError};
pub use pipeline::{Fetchers, Pipeline, PipelineReport};
pub use results::{PageRecord, ScrapeBatchResult, ScrapeOutcome};
pub use search::{ResultSet, SearchQuery};
