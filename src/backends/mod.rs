//! The backend contract and its implementations.
//!
//! Every operation on [`SearchBackend`] is fail-soft: internal errors are
//! logged inside the backend and surface as an empty list, `false` or `0`.

pub mod external;
pub mod registry;
pub mod relational;
mod suggest;

pub use external::{Elasticsearch, ExternalBackend, Meilisearch, OpenSearch, SearchEngine};
pub use registry::{BackendContext, BackendFactory, BackendRegistry, EngineSettings};
pub use relational::{RelationalBackend, RELATIONAL_BACKEND};

use crate::domain::TenantId;
use crate::models::{Record, SearchQuery, SearchResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Coarse health of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    NotConfigured,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::NotConfigured => "not_configured",
        };
        f.write_str(label)
    }
}

/// Result of a backend health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: Map<String, Value>,
}

impl HealthReport {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Contract every search engine adapter implements.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &str;

    /// Ranked, paginated results for `query` over `models` (all models when `None`).
    async fn search(&self, query: &SearchQuery, models: Option<&[String]>) -> Vec<SearchResult>;

    /// Index or overwrite one record. Returns whether it succeeded.
    async fn index_record(&self, model: &str, record: &Record) -> bool;

    async fn delete_record(&self, model: &str, record_id: &str) -> bool;

    /// Index many records, returning how many were accepted.
    async fn bulk_index(&self, model: &str, records: &[Record]) -> usize;

    async fn rebuild_index(&self, models: Option<&[String]>) -> bool;

    /// Distinct values of `field` in the tenant's records that match `prefix`, best first.
    async fn get_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        tenant_id: &TenantId,
    ) -> Vec<String>;

    async fn health_check(&self) -> HealthReport;
}
