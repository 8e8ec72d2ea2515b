//! Error types for the search engine.
//!
//! Three classes exist and they propagate differently:
//! - [`ValidationError`] is the only class that reaches a caller as an explicit failure.
//! - [`BackendError`] is always caught at the backend/service boundary and turned into
//!   an empty result plus a log line.
//! - [`ConfigError`] is reported at construction or backend-switch time.

use thiserror::Error;

/// A malformed query or request, rejected before any backend is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Query string empty or whitespace
    #[error("Search query cannot be empty")]
    EmptyQuery,

    /// Query string shorter than the surface allows
    #[error("Search query must be at least {min} characters")]
    QueryTooShort { min: usize },

    /// Query string longer than the engine accepts
    #[error("Search query too long (max {max} characters)")]
    QueryTooLong { max: usize },

    /// Tenant id missing or blank
    #[error("Tenant id is required")]
    MissingTenant,

    /// `max_results` outside 1..=1000
    #[error("max_results must be between 1 and {max}, got {value}")]
    MaxResultsOutOfRange { value: i64, max: usize },

    /// Negative offset
    #[error("offset must be >= 0, got {0}")]
    NegativeOffset(i64),

    /// Unknown sort order keyword
    #[error("Invalid sort order: {0} (expected 'asc' or 'desc')")]
    InvalidSortOrder(String),

    /// Model/entity type not present in the catalog
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Boost weight that is negative or not finite
    #[error("Invalid boost for field {field}: {value}")]
    InvalidBoost { field: String, value: f64 },
}

/// Failures inside a backend. Never surfaced to search callers.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Relational store failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport failure talking to an engine
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Engine answered with an error status
    #[error("Engine error (status {status}): {message}")]
    Engine { status: u16, message: String },

    /// Failed to parse an engine response
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Deadline exceeded
    #[error("Backend call timed out after {0}ms")]
    Timeout(u64),

    /// Engine client was never initialized
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    /// Operation makes no sense for this backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Backend code panicked
    #[error("Backend panicked: {0}")]
    Panicked(String),

    /// Generic failure with context
    #[error("Backend error: {0}")]
    Other(String),
}

/// Errors that can occur during configuration loading or backend selection.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    /// Backend name not present in the registry
    #[error("Unknown search backend: {name} (available: {available})")]
    UnknownBackend { name: String, available: String },

    /// Backend factory refused to build
    #[error("Failed to initialize backend {name}: {reason}")]
    BackendInit { name: String, reason: String },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Other(String),
}

/// Convenience type alias for Results with ValidationError
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Convenience type alias for Results with BackendError
pub type BackendResult<T> = Result<T, BackendError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ValidationError::EmptyQuery;
        assert_eq!(err.to_string(), "Search query cannot be empty");

        let err = ConfigError::MissingVar("SEARCH_ENGINE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: SEARCH_ENGINE_URL"
        );

        let err = BackendError::Timeout(250);
        assert_eq!(err.to_string(), "Backend call timed out after 250ms");
    }

    #[test]
    fn test_engine_error_variant() {
        let err = BackendError::Engine {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_unknown_backend_lists_available() {
        let err = ConfigError::UnknownBackend {
            name: "solr".to_string(),
            available: "relational, meilisearch".to_string(),
        };
        assert!(err.to_string().contains("solr"));
        assert!(err.to_string().contains("meilisearch"));
    }
}
