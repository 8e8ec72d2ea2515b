//! The search facade.
//!
//! [`SearchService`] validates requests, runs them against the active
//! backend under a deadline and a panic guard, applies the GDPR filter and
//! assembles the response. Only validation errors reach callers; every
//! backend failure degrades to an empty result.

mod request;

pub use request::{SearchRequest, ServiceHealth, SuggestionEntry};

use crate::backends::{
    BackendContext, BackendRegistry, HealthReport, HealthStatus, SearchBackend, RELATIONAL_BACKEND,
};
use crate::domain::RequestContext;
use crate::error::{BackendError, BackendResult, ConfigResult, ValidationResult};
use crate::metrics::Metrics;
use crate::models::result::order_results;
use crate::models::{ModelCatalog, Record, ScoringConfig, SearchResponse};
use crate::privacy::{GdprConfig, SensitivityFilter};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Name reported in health payloads.
pub const SERVICE_NAME: &str = "crm-search";

/// Audit label recorded when the GDPR filter ran.
pub const GDPR_FILTER: &str = "GDPR";

/// Record suggestions returned per query.
pub const RECORD_SUGGESTION_LIMIT: i64 = 20;

/// Shortest query that produces record suggestions.
pub const MIN_SUGGESTION_QUERY_CHARS: usize = 2;

pub struct SearchService {
    registry: BackendRegistry,
    context: BackendContext,
    backend: RwLock<Arc<dyn SearchBackend>>,
    filter: SensitivityFilter,
    timeout: Duration,
}

/// Assembles a [`SearchService`]; backends are registered here, before the
/// service exists.
pub struct SearchServiceBuilder {
    context: BackendContext,
    registry: BackendRegistry,
    backend: String,
    gdpr: GdprConfig,
    timeout: Duration,
}

impl SearchServiceBuilder {
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add a backend type to the registry the service will own.
    pub fn register_backend<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&BackendContext) -> ConfigResult<Arc<dyn SearchBackend>> + Send + Sync + 'static,
    {
        self.registry = self.registry.register(name, factory);
        self
    }

    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = name.into();
        self
    }

    pub fn gdpr(mut self, gdpr: GdprConfig) -> Self {
        self.gdpr = gdpr;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Unknown backend name, a failing backend factory, invalid scoring
    /// parameters or a conflicting GDPR policy.
    pub fn build(self) -> ConfigResult<SearchService> {
        self.context.scoring.validate()?;
        let filter = SensitivityFilter::new(self.gdpr)?;
        let backend = self.registry.create(&self.backend, &self.context)?;
        tracing::info!(backend = backend.name(), "Search service ready");

        Ok(SearchService {
            registry: self.registry,
            context: self.context,
            backend: RwLock::new(backend),
            filter,
            timeout: self.timeout,
        })
    }
}

impl SearchService {
    /// Start from the default registry, the relational backend, default
    /// GDPR policy and the context's engine timeout.
    pub fn builder(context: BackendContext) -> SearchServiceBuilder {
        let timeout = context.engine.timeout;
        SearchServiceBuilder {
            context,
            registry: BackendRegistry::with_defaults(),
            backend: RELATIONAL_BACKEND.to_string(),
            gdpr: GdprConfig::default(),
            timeout,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.context.catalog
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.context.scoring
    }

    pub fn gdpr(&self) -> &GdprConfig {
        self.filter.config()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.context.metrics
    }

    pub fn available_backends(&self) -> Vec<String> {
        self.registry.names()
    }

    pub async fn active_backend_name(&self) -> String {
        self.current().await.name().to_string()
    }

    /// Snapshot of the active backend; the lock is released immediately.
    async fn current(&self) -> Arc<dyn SearchBackend> {
        self.backend.read().await.clone()
    }

    /// Run a search.
    ///
    /// # Errors
    ///
    /// Only `ValidationError`; backend failures, timeouts and panics yield
    /// an empty response.
    pub async fn search(&self, request: SearchRequest) -> ValidationResult<SearchResponse> {
        let start = Instant::now();
        let query = request.to_query()?;
        let models = request.models.clone().filter(|m| !m.is_empty());
        self.catalog().resolve(models.as_deref())?;

        let backend = self.current().await;
        let deadline = request.timeout.unwrap_or(self.timeout);

        let outcome = guard(Some(deadline), backend.search(&query, models.as_deref())).await;
        let mut results = match outcome {
            Ok(results) => results,
            Err(e) => {
                let elapsed = start.elapsed();
                if matches!(e, BackendError::Timeout(_)) {
                    self.metrics().record_search_timeout();
                }
                self.metrics().record_search_failure();
                self.metrics().record_search(elapsed);
                tracing::error!(
                    tenant_id = %query.tenant_id(),
                    backend = backend.name(),
                    "Search failed: {}",
                    e
                );
                return Ok(SearchResponse::empty(query, backend.name(), millis(elapsed)));
            }
        };

        order_results(&mut results, &query);
        results.truncate(query.max_results());

        let mut filters_applied = Vec::new();
        if request.apply_gdpr
            && self.filter.enabled()
            && !self.filter.is_bypassed(query.user_id(), query.user_role())
        {
            for result in &mut results {
                self.filter
                    .filter_search_result(result, query.user_id(), query.user_role());
            }
            filters_applied.push(GDPR_FILTER.to_string());
        }

        let elapsed = start.elapsed();
        self.metrics().record_search(elapsed);
        tracing::info!(
            tenant_id = %query.tenant_id(),
            backend = backend.name(),
            result_count = results.len(),
            duration_ms = millis(elapsed),
            "Search completed"
        );

        Ok(SearchResponse::new(
            query,
            results,
            backend.name(),
            millis(elapsed),
            filters_applied,
        ))
    }

    /// Ranked distinct values of `field` starting with or resembling `prefix`,
    /// filtered for the requester like search payloads are.
    pub async fn get_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        ctx: &RequestContext,
    ) -> Vec<String> {
        if prefix.trim().is_empty() || limit == 0 {
            return Vec::new();
        }
        let backend = self.current().await;
        let values = guard(
            Some(self.timeout),
            backend.get_suggestions(prefix, field, limit, &ctx.tenant_id),
        )
        .await
        .unwrap_or_else(|e| {
            tracing::error!(backend = backend.name(), "Suggestions failed: {}", e);
            Vec::new()
        });

        if !self.filter.enabled() {
            return values;
        }
        self.filter.filter_field_values(
            field,
            values,
            ctx.user_id.as_deref(),
            ctx.user_role.as_deref(),
        )
    }

    /// Up to twenty `{type, id, text, subtitle}` entries for type-ahead.
    /// Empty for queries shorter than two characters.
    pub async fn record_suggestions(&self, query: &str, ctx: &RequestContext) -> Vec<SuggestionEntry> {
        if query.trim().chars().count() < MIN_SUGGESTION_QUERY_CHARS {
            return Vec::new();
        }

        let request = SearchRequest::new(query, ctx.tenant_id.as_str())
            .user(ctx.user_id.clone(), ctx.user_role.clone())
            .page(RECORD_SUGGESTION_LIMIT, 0);
        let response = match self.search(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Suggestion query rejected: {}", e);
                return Vec::new();
            }
        };

        response
            .results
            .iter()
            .filter_map(|r| {
                self.catalog()
                    .get(&r.model)
                    .map(|spec| SuggestionEntry::from_result(spec, r))
            })
            .collect()
    }

    pub async fn index_record(&self, model: &str, record: &Record) -> bool {
        let backend = self.current().await;
        guard(Some(self.timeout), backend.index_record(model, record))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(backend = backend.name(), model, "Index failed: {}", e);
                false
            })
    }

    pub async fn delete_record(&self, model: &str, record_id: &str) -> bool {
        let backend = self.current().await;
        guard(Some(self.timeout), backend.delete_record(model, record_id))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(backend = backend.name(), model, "Delete failed: {}", e);
                false
            })
    }

    /// Bulk work is not bounded by the per-request deadline.
    pub async fn bulk_index(&self, model: &str, records: &[Record]) -> usize {
        let backend = self.current().await;
        guard(None, backend.bulk_index(model, records))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(backend = backend.name(), model, "Bulk index failed: {}", e);
                0
            })
    }

    pub async fn rebuild_index(&self, models: Option<&[String]>) -> bool {
        let backend = self.current().await;
        guard(None, backend.rebuild_index(models))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(backend = backend.name(), "Rebuild failed: {}", e);
                false
            })
    }

    /// Active backend health plus the service's own GDPR flag and metrics.
    pub async fn health_check(&self) -> ServiceHealth {
        let backend = self.current().await;
        let report = guard(Some(self.timeout), backend.health_check())
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(backend = backend.name(), "Health check failed: {}", e);
                HealthReport::new(HealthStatus::Unhealthy).with_detail("error", e.to_string())
            });

        let mut details = report.details;
        if let Ok(metrics) = serde_json::to_value(self.metrics().summary()) {
            details.insert("metrics".to_string(), metrics);
        }
        details.insert(
            "available_backends".to_string(),
            Value::from(self.available_backends()),
        );

        ServiceHealth {
            service: SERVICE_NAME.to_string(),
            backend: backend.name().to_string(),
            status: report.status,
            details,
            gdpr_enabled: self.filter.enabled(),
        }
    }

    /// Replace the active backend. In-flight calls keep the backend they
    /// started with; on error nothing changes.
    pub async fn switch_backend(&self, name: &str) -> ConfigResult<()> {
        let next = self.registry.create(name, &self.context)?;
        let mut active = self.backend.write().await;
        tracing::info!(from = active.name(), to = next.name(), "Switching search backend");
        *active = next;
        Ok(())
    }
}

/// Bound a backend call by an optional deadline and turn panics into errors.
async fn guard<T, F>(deadline: Option<Duration>, call: F) -> BackendResult<T>
where
    F: Future<Output = T>,
{
    let guarded = AssertUnwindSafe(call).catch_unwind();
    let outcome = match deadline {
        Some(deadline) => tokio::time::timeout(deadline, guarded)
            .await
            .map_err(|_| BackendError::Timeout(deadline.as_millis() as u64))?,
        None => guarded.await,
    };
    outcome.map_err(|panic| BackendError::Panicked(panic_message(panic.as_ref())))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_values_through() {
        let value = guard(Some(Duration::from_secs(1)), async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guard_times_out() {
        let err = guard(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BackendError::Timeout(10)));
    }

    #[tokio::test]
    async fn test_guard_catches_panics() {
        let err = guard(None, async {
            panic!("boom");
        })
        .await
        .unwrap_err();
        match err {
            BackendError::Panicked(message) => assert_eq!(message, "boom"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
