//! Named backend factories, owned by whoever builds the service.

use super::external::{
    Elasticsearch, ExternalBackend, Meilisearch, OpenSearch, ELASTICSEARCH_BACKEND,
    MEILISEARCH_BACKEND, OPENSEARCH_BACKEND,
};
use super::relational::{RelationalBackend, RELATIONAL_BACKEND};
use super::SearchBackend;
use crate::error::{ConfigError, ConfigResult};
use crate::metrics::Metrics;
use crate::models::{ModelCatalog, ScoringConfig};
use crate::repositories::RecordRepository;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for an external engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Base URL; `None` leaves external backends not configured
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Index names are `{index_prefix}_{model}`
    pub index_prefix: String,
    pub timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            index_prefix: "crm".to_string(),
            timeout: Duration::from_millis(5000),
        }
    }
}

/// Shared, read-only dependencies handed to every factory.
#[derive(Clone)]
pub struct BackendContext {
    pub catalog: Arc<ModelCatalog>,
    pub scoring: Arc<ScoringConfig>,
    pub repository: Arc<dyn RecordRepository>,
    pub engine: EngineSettings,
    pub metrics: Metrics,
}

impl fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendContext")
            .field("models", &self.catalog.names())
            .field("storage", &self.repository.capabilities().storage)
            .field("engine_url", &self.engine.url)
            .finish()
    }
}

/// Builds a backend from the shared context.
pub type BackendFactory =
    Arc<dyn Fn(&BackendContext) -> ConfigResult<Arc<dyn SearchBackend>> + Send + Sync>;

/// Backend types available to a service, by name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Relational plus the three external engines.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(RELATIONAL_BACKEND, |ctx| {
                Ok(Arc::new(RelationalBackend::new(
                    ctx.repository.clone(),
                    ctx.catalog.clone(),
                    ctx.scoring.clone(),
                )) as Arc<dyn SearchBackend>)
            })
            .register(MEILISEARCH_BACKEND, |ctx| {
                Ok(Arc::new(ExternalBackend::from_context(Meilisearch, ctx)) as Arc<dyn SearchBackend>)
            })
            .register(ELASTICSEARCH_BACKEND, |ctx| {
                Ok(Arc::new(ExternalBackend::from_context(Elasticsearch, ctx)) as Arc<dyn SearchBackend>)
            })
            .register(OPENSEARCH_BACKEND, |ctx| {
                Ok(Arc::new(ExternalBackend::from_context(OpenSearch, ctx)) as Arc<dyn SearchBackend>)
            })
    }

    /// Add or replace a backend type.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BackendContext) -> ConfigResult<Arc<dyn SearchBackend>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into().to_lowercase(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Instantiate the backend registered under `name` (case-insensitive).
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownBackend` when nothing is registered under `name`,
    /// or whatever the factory itself reports.
    pub fn create(&self, name: &str, ctx: &BackendContext) -> ConfigResult<Arc<dyn SearchBackend>> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownBackend {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(ctx)
    }
}
