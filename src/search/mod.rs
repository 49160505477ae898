pub mod engine;
pub mod result_set;

pub use engine::{EngineAttempt, SearchEngine};
pub use result_set::{ResultSet, ResultSetBuilder, SearchQuery};
