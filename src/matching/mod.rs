//! Text matching primitives used by the relational backend.
//!
//! - Trigram similarity (0.0-1.0) in the style of PostgreSQL's `pg_trgm`
//! - Case-insensitive substring matching for the exact mode
//! - Snippet generation for highlights

pub mod snippet;
pub mod trigram;

pub use snippet::{generate_snippet, strip_html};
pub use trigram::{contains_ignore_case, field_similarity, similarity, trigrams};
