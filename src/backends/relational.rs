//! Trigram full-text search over the tenant's own records.
//!
//! Rows come from a [`RecordRepository`] that is always asked for one tenant
//! only; matching and scoring run on the returned rows in memory.

use super::suggest::rank_suggestions;
use super::{HealthReport, HealthStatus, SearchBackend};
use crate::domain::TenantId;
use crate::error::{BackendError, BackendResult};
use crate::matching::{contains_ignore_case, field_similarity, generate_snippet};
use crate::models::result::{order_results, paginate};
use crate::models::{ModelCatalog, ModelSpec, Record, ScoringConfig, SearchQuery, SearchResult};
use crate::repositories::RecordRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const RELATIONAL_BACKEND: &str = "relational";

/// Base score of a row that matches in exact mode.
const EXACT_BASE_SCORE: f64 = 50.0;

pub struct RelationalBackend {
    repository: Arc<dyn RecordRepository>,
    catalog: Arc<ModelCatalog>,
    scoring: Arc<ScoringConfig>,
}

/// A row that survived the similarity floor, with its per-field similarities.
struct Candidate {
    record: Record,
    best: f64,
    similarities: Vec<(String, f64)>,
}

impl RelationalBackend {
    pub fn new(
        repository: Arc<dyn RecordRepository>,
        catalog: Arc<ModelCatalog>,
        scoring: Arc<ScoringConfig>,
    ) -> Self {
        Self {
            repository,
            catalog,
            scoring,
        }
    }

    async fn try_search(
        &self,
        query: &SearchQuery,
        models: Option<&[String]>,
    ) -> BackendResult<Vec<SearchResult>> {
        let specs = self
            .catalog
            .resolve(models)
            .map_err(|e| BackendError::Other(e.to_string()))?;
        let now = Utc::now();
        let mut results = Vec::new();

        for spec in specs {
            let rows = self.tenant_rows(spec, query).await?;
            let scored = if query.fuzzy() {
                self.score_fuzzy(spec, rows, query, now)
            } else {
                self.score_exact(spec, rows, query)
            };
            tracing::debug!(model = %spec.name, matches = scored.len(), "Scored model");
            results.extend(scored);
        }

        order_results(&mut results, query);
        Ok(paginate(results, query))
    }

    /// Rows of the query's tenant, active-only unless inactive rows were
    /// requested, narrowed by the structured filters.
    async fn tenant_rows(&self, spec: &ModelSpec, query: &SearchQuery) -> BackendResult<Vec<Record>> {
        let tenant = query.tenant_id();
        let rows = self
            .repository
            .find_by_tenant(spec, tenant, !query.include_inactive())
            .await?;

        Ok(rows
            .into_iter()
            .filter(|r| r.tenant_id == tenant.as_str())
            .filter(|r| query.include_inactive() || r.is_active)
            .filter(|r| matches_filters(r, query.filters()))
            .collect())
    }

    fn score_fuzzy(
        &self,
        spec: &ModelSpec,
        rows: Vec<Record>,
        query: &SearchQuery,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let threshold = self.scoring.similarity_threshold;
        let q = query.query_string();

        let mut candidates: Vec<Candidate> = rows
            .into_iter()
            .filter_map(|record| {
                let similarities: Vec<(String, f64)> = spec
                    .searchable_fields
                    .iter()
                    .filter_map(|field| {
                        record
                            .text(field)
                            .map(|text| (field.clone(), field_similarity(q, &text)))
                    })
                    .collect();
                let best = similarities.iter().map(|(_, s)| *s).fold(0.0, f64::max);
                (best > 0.0 && best >= threshold).then_some(Candidate {
                    record,
                    best,
                    similarities,
                })
            })
            .collect();

        candidates.sort_by(|a, b| b.best.total_cmp(&a.best));
        candidates.truncate(self.scoring.max_candidates_per_model);

        candidates
            .into_iter()
            .map(|candidate| {
                let score = self.fuzzy_score(&candidate, query, now);
                let matched: Vec<String> = candidate
                    .similarities
                    .iter()
                    .filter(|(_, s)| *s >= threshold)
                    .map(|(f, _)| f.clone())
                    .collect();
                build_result(spec, &candidate.record, score, matched, q)
            })
            .collect()
    }

    /// Similarity × 100, then field-weight boosts, recency, and the active
    /// boost when inactive rows are part of the search.
    fn fuzzy_score(&self, candidate: &Candidate, query: &SearchQuery, now: DateTime<Utc>) -> f64 {
        let scoring = &self.scoring;
        let mut score = candidate.best * 100.0;

        for (field, sim) in &candidate.similarities {
            if *sim > scoring.similarity_threshold {
                let weight = scoring.weight_for(field, query.boost_fields());
                score *= 1.0 + weight * scoring.field_weight_factor;
            }
        }

        if let Some(age) = candidate.record.age_days(now) {
            if scoring.recency_decay_days > 0.0 && age < scoring.recency_decay_days {
                let freshness = 1.0 - age / scoring.recency_decay_days;
                score *= 1.0 + freshness * (scoring.recent_record_boost - 1.0);
            }
        }

        if query.include_inactive() && candidate.record.is_active {
            score *= scoring.active_record_boost;
        }

        score
    }

    fn score_exact(&self, spec: &ModelSpec, rows: Vec<Record>, query: &SearchQuery) -> Vec<SearchResult> {
        let q = query.query_string();

        rows.into_iter()
            .filter_map(|record| {
                let matched: Vec<String> = spec
                    .searchable_fields
                    .iter()
                    .filter(|field| {
                        record
                            .text(field)
                            .is_some_and(|text| contains_ignore_case(&text, q))
                    })
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                let score = matched.iter().fold(EXACT_BASE_SCORE, |acc, field| {
                    acc + self.scoring.weight_for(field, query.boost_fields())
                });
                Some(build_result(spec, &record, score, matched, q))
            })
            .take(self.scoring.max_candidates_per_model)
            .collect()
    }

    async fn try_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        tenant_id: &TenantId,
    ) -> BackendResult<Vec<String>> {
        let mut values = Vec::new();
        for spec in self.catalog.models() {
            if !spec.is_searchable(field) {
                continue;
            }
            let rows = self.repository.find_by_tenant(spec, tenant_id, true).await?;
            values.extend(
                rows.iter()
                    .filter(|r| r.tenant_id == tenant_id.as_str())
                    .filter_map(|r| r.text(field)),
            );
        }
        Ok(rank_suggestions(prefix, values, &self.scoring, limit))
    }
}

/// All filters must equal (case-insensitively) the record's field text.
pub(crate) fn matches_filters(record: &Record, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(field, expected)| {
        let actual = if field == "id" {
            Some(record.id.clone())
        } else {
            record.text(field)
        };
        actual.is_some_and(|a| a.to_lowercase() == expected.to_lowercase())
    })
}

fn build_result(
    spec: &ModelSpec,
    record: &Record,
    score: f64,
    matched_fields: Vec<String>,
    query: &str,
) -> SearchResult {
    let mut result = SearchResult::new(&spec.name, &record.id, score).with_data(record.payload());
    for field in &matched_fields {
        if let Some(text) = record.text(field) {
            result
                .highlights
                .insert(field.clone(), vec![generate_snippet(&text, query)]);
        }
    }
    result.matched_fields = matched_fields;
    result
}

#[async_trait]
impl SearchBackend for RelationalBackend {
    fn name(&self) -> &str {
        RELATIONAL_BACKEND
    }

    async fn search(&self, query: &SearchQuery, models: Option<&[String]>) -> Vec<SearchResult> {
        match self.try_search(query, models).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(
                    backend = RELATIONAL_BACKEND,
                    tenant_id = %query.tenant_id(),
                    "Search failed: {}",
                    e
                );
                Vec::new()
            }
        }
    }

    /// Rows are searched where they live; there is nothing to index.
    async fn index_record(&self, _model: &str, _record: &Record) -> bool {
        true
    }

    async fn delete_record(&self, _model: &str, _record_id: &str) -> bool {
        true
    }

    async fn bulk_index(&self, _model: &str, records: &[Record]) -> usize {
        records.len()
    }

    async fn rebuild_index(&self, models: Option<&[String]>) -> bool {
        match self.catalog.resolve(models) {
            Ok(specs) => {
                tracing::info!(
                    backend = RELATIONAL_BACKEND,
                    models = specs.len(),
                    "Rebuild requested; relational rows need no index refresh"
                );
                true
            }
            Err(e) => {
                tracing::error!(backend = RELATIONAL_BACKEND, "Rebuild failed: {}", e);
                false
            }
        }
    }

    async fn get_suggestions(
        &self,
        prefix: &str,
        field: &str,
        limit: usize,
        tenant_id: &TenantId,
    ) -> Vec<String> {
        match self.try_suggestions(prefix, field, limit, tenant_id).await {
            Ok(values) => values,
            Err(e) => {
                tracing::error!(backend = RELATIONAL_BACKEND, "Suggestions failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn health_check(&self) -> HealthReport {
        let capabilities = self.repository.capabilities();
        let report = HealthReport::new(HealthStatus::Healthy)
            .with_detail("storage", capabilities.storage)
            .with_detail("trigram_similarity", capabilities.trigram_similarity);

        if let Err(e) = self.repository.ping().await {
            tracing::warn!(backend = RELATIONAL_BACKEND, "Health check failed: {}", e);
            return HealthReport {
                status: HealthStatus::Unhealthy,
                ..report
            }
            .with_detail("error", e.to_string());
        }

        let mut counts = Map::new();
        for spec in self.catalog.models() {
            match self.repository.count_by_model(spec, None).await {
                Ok(n) => {
                    counts.insert(spec.name.clone(), Value::from(n));
                }
                Err(e) => {
                    return HealthReport {
                        status: HealthStatus::Degraded,
                        ..report
                    }
                    .with_detail("error", e.to_string());
                }
            }
        }

        let status = if capabilities.trigram_similarity {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };
        HealthReport { status, ..report }.with_detail("record_counts", Value::Object(counts))
    }
}
