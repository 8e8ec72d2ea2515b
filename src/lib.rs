//! Tenant-scoped search and relevance ranking for CRM records.
//!
//! # Architecture
//!
//! - **models**: queries, results, scoring parameters and the model catalog
//! - **domain**: tenant and request-context value objects
//! - **matching**: trigram similarity and highlight snippets
//! - **privacy**: field sensitivity classification and GDPR masking
//! - **repositories**: record store abstraction (in-memory, SQLite)
//! - **backends**: the `SearchBackend` trait, the relational engine, external
//!   engine adapters and the backend registry
//! - **client**: HTTP client for external engines
//! - **service**: the `SearchService` facade
//! - **http** / **server** / **cli**: HTTP, MCP and command-line surfaces

pub mod backends;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod matching;
pub mod metrics;
pub mod models;
pub mod privacy;
pub mod repositories;
pub mod server;
pub mod service;

pub use backends::{
    BackendContext, BackendRegistry, HealthReport, HealthStatus, RelationalBackend, SearchBackend,
};
pub use config::Config;
pub use domain::{RequestContext, TenantId};
pub use error::{BackendError, ConfigError, ValidationError};
pub use metrics::{Metrics, MetricsSummary};
pub use models::{
    ModelCatalog, ModelSpec, Record, ScoringConfig, SearchQuery, SearchResponse, SearchResult,
};
pub use privacy::{GdprConfig, SensitivityFilter};
pub use server::SearchMcpServer;
pub use service::{SearchRequest, SearchService, ServiceHealth, SuggestionEntry};
