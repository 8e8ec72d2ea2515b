//! Meilisearch dialect.
//!
//! Typo tolerance is always on in Meilisearch, so exact mode relies on the
//! substring post-filter in [`super::ExternalBackend`]. Ranking scores are
//! already in 0..=1.

use super::{id_text, EngineHit, EngineRequest, SearchEngine};
use crate::backends::HealthStatus;
use crate::client::Method;
use crate::error::{BackendError, BackendResult};
use crate::models::{ModelSpec, SearchQuery};
use serde_json::{json, Map, Value};

pub const MEILISEARCH_BACKEND: &str = "meilisearch";

#[derive(Debug, Clone, Copy, Default)]
pub struct Meilisearch;

/// Meilisearch filter expression scoping a search to one tenant.
fn tenant_filter(query: &SearchQuery) -> String {
    let tenant = query.tenant_id().as_str().replace('\\', "\\\\").replace('"', "\\\"");
    let mut filter = format!("tenant_id = \"{}\"", tenant);
    if !query.include_inactive() {
        filter.push_str(" AND is_active = true");
    }
    filter
}

impl SearchEngine for Meilisearch {
    fn name(&self) -> &'static str {
        MEILISEARCH_BACKEND
    }

    fn authorization(&self, api_key: &str) -> String {
        format!("Bearer {}", api_key)
    }

    fn search_request(
        &self,
        index: &str,
        query: &SearchQuery,
        _fields: &[String],
        fuzzy: bool,
        from: usize,
        size: usize,
    ) -> EngineRequest {
        let mut body = json!({
            "q": query.query_string(),
            "offset": from,
            "limit": size,
            "filter": tenant_filter(query),
            "showRankingScore": true,
        });
        if !fuzzy {
            body["matchingStrategy"] = json!("all");
        }
        EngineRequest::new(Method::Post, format!("/indexes/{}/search", index)).with_body(body)
    }

    fn parse_hits(&self, body: &Value) -> BackendResult<Vec<EngineHit>> {
        let hits = body
            .get("hits")
            .and_then(Value::as_array)
            .ok_or_else(|| BackendError::Other("Meilisearch response has no hits".to_string()))?;

        Ok(hits
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|hit| {
                let id = id_text(hit.get("id")?)?;
                let score = hit
                    .get("_rankingScore")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0)
                    * 100.0;
                let source: Map<String, Value> = hit
                    .iter()
                    .filter(|(k, _)| !k.starts_with('_'))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Some(EngineHit { id, score, source })
            })
            .collect())
    }

    fn index_request(&self, index: &str, _id: &str, document: &Map<String, Value>) -> EngineRequest {
        EngineRequest::new(Method::Post, format!("/indexes/{}/documents", index))
            .with_body(json!([document]))
    }

    fn delete_request(&self, index: &str, id: &str) -> EngineRequest {
        EngineRequest::new(
            Method::Delete,
            format!("/indexes/{}/documents/{}", index, urlencoding::encode(id)),
        )
    }

    fn bulk_request(&self, index: &str, documents: &[Map<String, Value>]) -> Option<EngineRequest> {
        Some(
            EngineRequest::new(Method::Post, format!("/indexes/{}/documents", index))
                .with_body(json!(documents)),
        )
    }

    fn recreate_index_requests(&self, index: &str, model: &ModelSpec) -> Vec<EngineRequest> {
        vec![
            EngineRequest::new(Method::Delete, format!("/indexes/{}", index)),
            EngineRequest::new(Method::Post, "/indexes")
                .with_body(json!({"uid": index, "primaryKey": "id"})),
            EngineRequest::new(
                Method::Put,
                format!("/indexes/{}/settings/filterable-attributes", index),
            )
            .with_body(json!(["tenant_id", "is_active"])),
            EngineRequest::new(
                Method::Put,
                format!("/indexes/{}/settings/searchable-attributes", index),
            )
            .with_body(json!(model.searchable_fields)),
        ]
    }

    fn health_request(&self) -> EngineRequest {
        EngineRequest::new(Method::Get, "/health")
    }

    fn parse_health(&self, body: &Value) -> HealthStatus {
        match body.get("status").and_then(Value::as_str) {
            Some("available") => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        }
    }
}
