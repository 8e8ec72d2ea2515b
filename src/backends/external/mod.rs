//! Adapters for third-party search engines.
//!
//! [`ExternalBackend`] owns everything the engines have in common: the HTTP
//! transport, index naming, the not-configured state, tenant re-checks and
//! result normalization. A [`SearchEngine`] only translates requests into the
//! engine's native shape and reads its responses back.

mod elasticsearch;
mod meilisearch;

pub use elasticsearch::{Elasticsearch, OpenSearch, ELASTICSEARCH_BACKEND, OPENSEARCH_BACKEND};
pub use meilisearch::{Meilisearch, MEILISEARCH_BACKEND};

use super::registry::BackendContext;
use super::relational::matches_filters;
use super::suggest::rank_suggestions;
use super::{HealthReport, HealthStatus, SearchBackend};
use crate::client::{AsyncEngineClient, EngineHttpClient, EngineTransport, Method};
use crate::domain::TenantId;
use crate::error::{BackendError, BackendResult};
use crate::matching::{contains_ignore_case, field_similarity, generate_snippet};
use crate::models::result::{order_results, paginate};
use crate::models::{ModelCatalog, ModelSpec, Record, ScoringConfig, SearchQuery, SearchResult};
use crate::repositories::RecordRepository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Candidate values fetched per requested suggestion.
const SUGGESTION_OVERFETCH: usize = 5;

/// Engine pages read per model while post-filters thin the hits.
const MAX_FETCH_PAGES: usize = 10;

/// One HTTP call in an engine's native dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl EngineRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A hit read back from an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineHit {
    pub id: String,
    pub score: f64,
    pub source: Map<String, Value>,
}

/// Request translation and response normalization for one engine.
pub trait SearchEngine: Send + Sync + 'static {
    /// Registry name of the engine.
    fn name(&self) -> &'static str;

    /// Whether hit scores are only comparable within one response. Such
    /// scores are rescaled to 0-100 against the best hit of the whole search.
    fn relative_scores(&self) -> bool {
        false
    }

    /// Whether the engine has native typo tolerance; without it fuzzy
    /// queries run as exact ones.
    fn supports_fuzzy(&self) -> bool {
        true
    }

    /// `Authorization` header value for an API key.
    fn authorization(&self, api_key: &str) -> String;

    /// Native query for one page of one index, `size` hits starting at
    /// `from`. Tenant and active filters must be part of it.
    fn search_request(
        &self,
        index: &str,
        query: &SearchQuery,
        fields: &[String],
        fuzzy: bool,
        from: usize,
        size: usize,
    ) -> EngineRequest;

    /// Hits of a search response, scores on 0-100 unless
    /// [`relative_scores`](Self::relative_scores) is set.
    fn parse_hits(&self, body: &Value) -> BackendResult<Vec<EngineHit>>;

    /// Upsert of one document; indexing the same id twice overwrites.
    fn index_request(&self, index: &str, id: &str, document: &Map<String, Value>) -> EngineRequest;

    fn delete_request(&self, index: &str, id: &str) -> EngineRequest;

    /// One request for many documents, or `None` to index them one by one.
    fn bulk_request(&self, index: &str, documents: &[Map<String, Value>]) -> Option<EngineRequest>;

    /// Requests that drop and recreate an index. The first one may 404.
    fn recreate_index_requests(&self, index: &str, model: &ModelSpec) -> Vec<EngineRequest>;

    fn health_request(&self) -> EngineRequest;

    fn parse_health(&self, body: &Value) -> HealthStatus;
}

/// A hit that passed the post-filters, score not yet rescaled.
struct Candidate<'a> {
    spec: &'a ModelSpec,
    record: Record,
    matched: Vec<String>,
    score: f64,
}

impl Candidate<'_> {
    fn into_result(self, scale: f64, q: &str) -> SearchResult {
        let mut result = SearchResult::new(&self.spec.name, &self.record.id, self.score * scale)
            .with_data(self.record.payload());
        for field in &self.matched {
            if let Some(text) = self.record.text(field) {
                result
                    .highlights
                    .insert(field.clone(), vec![generate_snippet(&text, q)]);
            }
        }
        result.matched_fields = self.matched;
        result
    }
}

/// [`SearchBackend`] over any [`SearchEngine`].
pub struct ExternalBackend<E: SearchEngine> {
    engine: E,
    transport: Option<Arc<dyn EngineTransport>>,
    catalog: Arc<ModelCatalog>,
    scoring: Arc<ScoringConfig>,
    repository: Arc<dyn RecordRepository>,
    index_prefix: String,
    not_configured_reason: Option<String>,
}

impl<E: SearchEngine> ExternalBackend<E> {
    /// Build from shared context. Without an engine URL the backend is
    /// constructed in the not-configured state.
    pub fn from_context(engine: E, ctx: &BackendContext) -> Self {
        let settings = &ctx.engine;
        let (transport, reason) = match &settings.url {
            Some(url) => {
                let mut client =
                    EngineHttpClient::new(url.clone(), settings.timeout, ctx.metrics.clone());
                if let Some(key) = &settings.api_key {
                    client = client.with_authorization(engine.authorization(key));
                }
                let transport: Arc<dyn EngineTransport> = Arc::new(AsyncEngineClient::new(client));
                (Some(transport), None)
            }
            None => (None, Some("SEARCH_ENGINE_URL is not set".to_string())),
        };

        if let Some(reason) = &reason {
            tracing::warn!(engine = engine.name(), "Search engine not configured: {}", reason);
        }

        Self {
            engine,
            transport,
            catalog: ctx.catalog.clone(),
            scoring: ctx.scoring.clone(),
            repository: ctx.repository.clone(),
            index_prefix: settings.index_prefix.clone(),
            not_configured_reason: reason,
        }
    }

    /// Build with an explicit transport.
    pub fn with_transport(engine: E, transport: Arc<dyn EngineTransport>, ctx: &BackendContext) -> Self {
        Self {
            engine,
            transport: Some(transport),
            catalog: ctx.catalog.clone(),
            scoring: ctx.scoring.clone(),
            repository: ctx.repository.clone(),
            index_prefix: ctx.engine.index_prefix.clone(),
            not_configured_reason: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    pub fn index_name(&self, model: &str) -> String {
        format!("{}_{}", self.index_prefix, model)
    }

    fn transport(&self) -> BackendResult<&Arc<dyn EngineTransport>> {
        self.transport.as_ref().ok_or_else(|| {
            BackendError::NotConfigured(
                self.not_configured_reason
                    .clone()
                    .unwrap_or_else(|| self.engine.name().to_string()),
            )
        })
    }

    async fn send(&self, request: EngineRequest) -> BackendResult<Value> {
        self.transport()?
            .send(request.method, &request.path, request.body)
            .await
    }

    fn model(&self, name: &str) -> BackendResult<&ModelSpec> {
        self.catalog
            .get(name)
            .ok_or_else(|| BackendError::Other(format!("Unknown model: {}", name)))
    }

    async fn try_search(
        &self,
        query: &SearchQuery,
        models: Option<&[String]>,
    ) -> BackendResult<Vec<SearchResult>> {
        self.transport()?;
        let specs = self
            .catalog
            .resolve(models)
            .map_err(|e| BackendError::Other(e.to_string()))?;
        let fuzzy = query.fuzzy() && self.engine.supports_fuzzy();

        let mut candidates = Vec::new();
        for spec in specs {
            self.fetch_model(spec, query, fuzzy, &mut candidates).await?;
        }

        let best_score = candidates.iter().map(|c| c.score).fold(0.0_f64, f64::max);
        let scale = match (self.engine.relative_scores(), best_score > 0.0) {
            (false, _) => 1.0,
            (true, true) => 100.0 / best_score,
            (true, false) => 0.0,
        };
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .map(|c| c.into_result(scale, query.query_string()))
            .collect();

        order_results(&mut results, query);
        Ok(paginate(results, query))
    }

    /// Page through one index until `query.window()` hits survive the
    /// post-filters or the engine runs dry.
    async fn fetch_model<'a>(
        &self,
        spec: &'a ModelSpec,
        query: &SearchQuery,
        fuzzy: bool,
        candidates: &mut Vec<Candidate<'a>>,
    ) -> BackendResult<()> {
        let index = self.index_name(&spec.name);
        let size = query.window();
        let mut kept = 0;
        let mut from = 0;

        for _ in 0..MAX_FETCH_PAGES {
            let request = self.engine.search_request(
                &index,
                query,
                &spec.searchable_fields,
                fuzzy,
                from,
                size,
            );
            let body = self.send(request).await?;
            let hits = self.engine.parse_hits(&body)?;
            let fetched = hits.len();

            for hit in hits {
                if kept < size {
                    if let Some(candidate) = self.admit(spec, hit, query, fuzzy) {
                        candidates.push(candidate);
                        kept += 1;
                    }
                }
            }

            from += fetched;
            if fetched < size || kept >= size {
                return Ok(());
            }
        }

        tracing::debug!(
            engine = self.engine.name(),
            model = %spec.name,
            kept,
            "Stopped paging engine hits"
        );
        Ok(())
    }

    /// Re-check the tenant and active flag, apply structured filters and,
    /// in exact mode, require a substring match.
    fn admit<'a>(
        &self,
        spec: &'a ModelSpec,
        hit: EngineHit,
        query: &SearchQuery,
        fuzzy: bool,
    ) -> Option<Candidate<'a>> {
        let record = Record::from_document(&hit.id, &hit.source)?;
        if record.tenant_id != query.tenant_id().as_str() {
            tracing::warn!(
                engine = self.engine.name(),
                model = %spec.name,
                "Dropping hit owned by another tenant"
            );
            return None;
        }
        if !query.include_inactive() && !record.is_active {
            return None;
        }
        if !matches_filters(&record, query.filters()) {
            return None;
        }

        let q = query.query_string();
        let threshold = self.scoring.similarity_threshold;
        let matched: Vec<String> = spec
            .searchable_fields
            .iter()
            .filter(|field| {
                record.text(field).is_some_and(|text| {
                    contains_ignore_case(&text, q)
                        || (fuzzy && field_similarity(q, &text) >= threshold)
                })
            })
            .cloned()
            .collect();
        if !fuzzy && matched.is_empty() {
            return None;
        }

        Some(Candidate {
            spec,
            record,
            matched,
            score: hit.score,
        })
    }

    async fn try_index(&self, model: &str, record: &Record) -> BackendResult<()> {
        let spec = self.model(model)?;
        let request = self.engine.index_request(
            &self.index_name(&spec.name),
            &record.id,
            &record.to_document(),
        );
        self.send(request).await?;
        Ok(())
    }

    async fn try_delete(&self, model: &str, record_id: &str) -> BackendResult<()> {
        let spec = self.model(model)?;
        let request = self
            .engine
            .delete_request(&self.index_name(&spec.name), record_id);
        self.send(request).await?;
        Ok(())
    }

    async fn try_bulk(&self, model: &str, records: &[Record]) -> BackendResult<usize> {
        let spec = self.model(model)?;
        if records.is_empty() {
            return Ok(0);
        }
        let index = self.index_name(&spec.name);
        let documents: Vec<Map<String, Value>> = records.iter().map(Record::to_document).collect();

        if let Some(request) = self.engine.bulk_request(&index, &documents) {
            self.send(request).await?;
            return Ok(records.len());
        }

        let mut indexed = 0;
        for record in records {
            match self.try_index(model, record).await {
                Ok(()) => indexed += 1,
                Err(e) => tracing::error!(
                    engine = self.engine.name(),
                    record_id = %record.id,
                    "Bulk index item failed: {}",
                    e
                ),
            }
        }
        Ok(indexed)
    }

    async fn try_rebuild(&self, models: Option<&[String]>) -> BackendResult<()> {
        self.transport()?;
        let specs = self
            .catalog
            .resolve(models)
            .map_err(|e| BackendError::Other(e.to_string()))?;

        for spec in specs {
            let index = self.index_name(&spec.name);
            for (i, request) in self
                .engine
                .recreate_index_requests(&index, spec)
                .into_iter()
                .enumerate()
            {
                match self.send(request).await {
                    Ok(_) => {}
                    Err(BackendError::Engine { status: 404, .. }) if i == 0 => {}
                    Err(e) => return Err(e),
                }
            }

            let records = self.repository.list_model(spec).await?;
            let indexed = self.try_bulk(&spec.name, &records).await?;
            tracing::info!(
                engine = self.engine.name(),
                index = %index,
                indexed,
                "Rebuilt index"
            );
        }
        Ok(())
    }

    async fn try_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        tenant_id: &TenantId,
    ) -> BackendResult<Vec<String>> {
        let models: Vec<String> = self
            .catalog
            .models()
            .iter()
            .filter(|m| m.is_searchable(field))
            .map(|m| m.name.clone())
            .collect();
        if models.is_empty() || prefix.trim().is_empty() {
            return Ok(Vec::new());
        }

        let window = (limit * SUGGESTION_OVERFETCH).clamp(1, self.scoring.max_candidates_per_model.max(1));
        let query = SearchQuery::builder(prefix, tenant_id.as_str())
            .max_results(window as i64)
            .build()
            .map_err(|e| BackendError::Other(e.to_string()))?;

        let results = self.try_search(&query, Some(&models)).await?;
        let values = results
            .iter()
            .filter_map(|r| r.data.get(field))
            .filter(|v| !v.is_null())
            .map(crate::models::result::value_text);
        Ok(rank_suggestions(prefix, values, &self.scoring, limit))
    }

    fn log_failure(&self, operation: &str, error: &BackendError) {
        match error {
            BackendError::NotConfigured(_) => {
                tracing::warn!(engine = self.engine.name(), "{} skipped: {}", operation, error)
            }
            _ => tracing::error!(engine = self.engine.name(), "{} failed: {}", operation, error),
        }
    }
}

#[async_trait]
impl<E: SearchEngine> SearchBackend for ExternalBackend<E> {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn search(&self, query: &SearchQuery, models: Option<&[String]>) -> Vec<SearchResult> {
        self.try_search(query, models).await.unwrap_or_else(|e| {
            self.log_failure("Search", &e);
            Vec::new()
        })
    }

    async fn index_record(&self, model: &str, record: &Record) -> bool {
        self.try_index(model, record)
            .await
            .map_err(|e| self.log_failure("Index", &e))
            .is_ok()
    }

    async fn delete_record(&self, model: &str, record_id: &str) -> bool {
        self.try_delete(model, record_id)
            .await
            .map_err(|e| self.log_failure("Delete", &e))
            .is_ok()
    }

    async fn bulk_index(&self, model: &str, records: &[Record]) -> usize {
        self.try_bulk(model, records).await.unwrap_or_else(|e| {
            self.log_failure("Bulk index", &e);
            0
        })
    }

    async fn rebuild_index(&self, models: Option<&[String]>) -> bool {
        self.try_rebuild(models)
            .await
            .map_err(|e| self.log_failure("Rebuild", &e))
            .is_ok()
    }

    async fn get_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        tenant_id: &TenantId,
    ) -> Vec<String> {
        self.try_suggestions(prefix, field, limit, tenant_id)
            .await
            .unwrap_or_else(|e| {
                self.log_failure("Suggestions", &e);
                Vec::new()
            })
    }

    async fn health_check(&self) -> HealthReport {
        let Some(transport) = &self.transport else {
            return HealthReport::new(HealthStatus::NotConfigured)
                .with_detail("engine", self.engine.name())
                .with_detail(
                    "reason",
                    self.not_configured_reason.clone().unwrap_or_default(),
                );
        };

        let report = HealthReport::new(HealthStatus::Healthy)
            .with_detail("engine", self.engine.name())
            .with_detail("endpoint", transport.endpoint())
            .with_detail("index_prefix", self.index_prefix.clone());

        match self.send(self.engine.health_request()).await {
            Ok(body) => HealthReport {
                status: self.engine.parse_health(&body),
                ..report
            },
            Err(e) => {
                tracing::warn!(engine = self.engine.name(), "Health check failed: {}", e);
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    ..report
                }
                .with_detail("error", e.to_string())
            }
        }
    }
}

/// Document id as text; engines may hand back numeric ids.
pub(crate) fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
