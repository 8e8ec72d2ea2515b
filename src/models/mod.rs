//! Value objects exchanged with every search backend.
//!
//! All of these are created fresh per request, except [`ScoringConfig`] and
//! [`ModelCatalog`], which are built once at startup and shared read-only.

pub mod catalog;
pub mod query;
pub mod record;
pub mod result;
pub mod scoring;

pub use catalog::{ModelCatalog, ModelSpec};
pub use query::{SearchQuery, SearchQueryBuilder, SortOrder, MAX_QUERY_LENGTH, MAX_RESULTS_LIMIT};
pub use record::Record;
pub use result::{SearchResponse, SearchResult, API_VERSION};
pub use scoring::ScoringConfig;
