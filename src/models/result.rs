//! Search results and the response envelope.

use super::query::{SearchQuery, SortOrder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Version tag stamped on every response.
pub const API_VERSION: &str = "v1";

/// Upper bound of the shared relevance scale.
pub const MAX_SCORE: f64 = 100.0;

/// One matched record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Entity type name (e.g. "customer")
    pub model: String,

    /// Id of the underlying record
    pub record_id: String,

    /// Relevance on the 0-100 scale; kept in range by every setter
    score: f64,

    /// Field payload
    pub data: Map<String, Value>,

    /// Context snippets per matching field
    pub highlights: BTreeMap<String, Vec<String>>,

    /// Fields that contributed to the match
    pub matched_fields: Vec<String>,

    /// Set once sensitivity filtering has been applied
    pub pii_filtered: bool,
}

impl SearchResult {
    pub fn new(model: impl Into<String>, record_id: impl Into<String>, score: f64) -> Self {
        Self {
            model: model.into(),
            record_id: record_id.into(),
            score: clamp_score(score),
            data: Map::new(),
            highlights: BTreeMap::new(),
            matched_fields: Vec::new(),
            pii_filtered: false,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = clamp_score(score);
    }
}

/// Clamp into [0, 100]; NaN collapses to 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, MAX_SCORE)
    }
}

/// Order by score descending. Equal scores are broken by the query's sort
/// field when it names one, otherwise they keep their incoming order.
pub fn order_results(results: &mut [SearchResult], query: &SearchQuery) {
    let tie_field = query.sorts_by_field().then(|| query.sort_by().to_string());
    let order = query.sort_order();

    results.sort_by(|a, b| {
        let by_score = b.score.total_cmp(&a.score);
        if by_score != Ordering::Equal {
            return by_score;
        }
        match &tie_field {
            Some(field) => {
                let cmp = compare_values(a.data.get(field), b.data.get(field));
                match order {
                    SortOrder::Asc => cmp,
                    SortOrder::Desc => cmp.reverse(),
                }
            }
            None => Ordering::Equal,
        }
    });
}

/// Cut the requested page out of fully ordered results.
pub fn paginate(results: Vec<SearchResult>, query: &SearchQuery) -> Vec<SearchResult> {
    results
        .into_iter()
        .skip(query.offset())
        .take(query.max_results())
        .collect()
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.total_cmp(&y)
        }
        (Some(x), Some(y)) => value_text(x).to_lowercase().cmp(&value_text(y).to_lowercase()),
    }
}

/// String form of a JSON scalar, as used for matching and filtering.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The full answer to one search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// The originating query
    pub query: SearchQuery,

    /// Ordered results, score descending
    pub results: Vec<SearchResult>,

    /// Number of results in this response
    pub total_count: usize,

    /// Wall-clock time spent, in milliseconds
    pub execution_time_ms: f64,

    /// Name of the engine that served the request
    pub backend: String,

    /// Audit trail of post-processing filters (e.g. "GDPR")
    pub filters_applied: Vec<String>,

    pub api_version: String,

    pub timestamp: DateTime<Utc>,
}

impl SearchResponse {
    pub fn new(
        query: SearchQuery,
        results: Vec<SearchResult>,
        backend: impl Into<String>,
        execution_time_ms: f64,
        filters_applied: Vec<String>,
    ) -> Self {
        Self {
            total_count: results.len(),
            query,
            results,
            execution_time_ms,
            backend: backend.into(),
            filters_applied,
            api_version: API_VERSION.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// A zero-result response for a search that degraded.
    pub fn empty(query: SearchQuery, backend: impl Into<String>, execution_time_ms: f64) -> Self {
        Self::new(query, Vec::new(), backend, execution_time_ms, Vec::new())
    }
}
