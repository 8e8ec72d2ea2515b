//! Elasticsearch and OpenSearch dialects.
//!
//! Both speak the same query DSL; they differ only in name and auth scheme.
//! Native `_score` is unbounded and only comparable within one search, so
//! hits carry it raw and the backend rescales across all indexes.

use super::{id_text, EngineHit, EngineRequest, SearchEngine};
use crate::backends::HealthStatus;
use crate::client::Method;
use crate::error::{BackendError, BackendResult};
use crate::models::{ModelSpec, SearchQuery};
use serde_json::{json, Map, Value};

pub const ELASTICSEARCH_BACKEND: &str = "elasticsearch";
pub const OPENSEARCH_BACKEND: &str = "opensearch";

#[derive(Debug, Clone, Copy, Default)]
pub struct Elasticsearch;

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSearch;

fn search_request(
    index: &str,
    query: &SearchQuery,
    fields: &[String],
    fuzzy: bool,
    from: usize,
    size: usize,
) -> EngineRequest {
    let mut multi_match = json!({
        "query": query.query_string(),
        "fields": fields,
    });
    if fuzzy {
        multi_match["fuzziness"] = json!("AUTO");
    }

    let mut filter = vec![json!({"term": {"tenant_id": query.tenant_id().as_str()}})];
    if !query.include_inactive() {
        filter.push(json!({"term": {"is_active": true}}));
    }

    let body = json!({
        "from": from,
        "size": size,
        "query": {
            "bool": {
                "must": [{"multi_match": multi_match}],
                "filter": filter,
            }
        }
    });
    EngineRequest::new(Method::Post, format!("/{}/_search", index)).with_body(body)
}

fn parse_hits(body: &Value) -> BackendResult<Vec<EngineHit>> {
    let hits = body
        .get("hits")
        .ok_or_else(|| BackendError::Other("Search response has no hits".to_string()))?;
    let items = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| BackendError::Other("Search response has no hit list".to_string()))?;

    Ok(items
        .iter()
        .filter_map(|hit| {
            let id = id_text(hit.get("_id")?)?;
            let score = hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0);
            let source = hit.get("_source")?.as_object()?.clone();
            Some(EngineHit { id, score, source })
        })
        .collect())
}

fn index_request(index: &str, id: &str, document: &Map<String, Value>) -> EngineRequest {
    EngineRequest::new(
        Method::Put,
        format!("/{}/_doc/{}", index, urlencoding::encode(id)),
    )
    .with_body(Value::Object(document.clone()))
}

fn delete_request(index: &str, id: &str) -> EngineRequest {
    EngineRequest::new(
        Method::Delete,
        format!("/{}/_doc/{}", index, urlencoding::encode(id)),
    )
}

fn recreate_index_requests(index: &str, model: &ModelSpec) -> Vec<EngineRequest> {
    let mut properties = Map::new();
    properties.insert("tenant_id".to_string(), json!({"type": "keyword"}));
    properties.insert("is_active".to_string(), json!({"type": "boolean"}));
    properties.insert("updated_at".to_string(), json!({"type": "date"}));
    for field in &model.searchable_fields {
        properties.insert(field.clone(), json!({"type": "text"}));
    }

    vec![
        EngineRequest::new(Method::Delete, format!("/{}", index)),
        EngineRequest::new(Method::Put, format!("/{}", index))
            .with_body(json!({"mappings": {"properties": properties}})),
    ]
}

fn parse_health(body: &Value) -> HealthStatus {
    match body.get("status").and_then(Value::as_str) {
        Some("green") => HealthStatus::Healthy,
        Some("yellow") => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

impl SearchEngine for Elasticsearch {
    fn name(&self) -> &'static str {
        ELASTICSEARCH_BACKEND
    }

    fn relative_scores(&self) -> bool {
        true
    }

    fn authorization(&self, api_key: &str) -> String {
        format!("ApiKey {}", api_key)
    }

    fn search_request(
        &self,
        index: &str,
        query: &SearchQuery,
        fields: &[String],
        fuzzy: bool,
        from: usize,
        size: usize,
    ) -> EngineRequest {
        search_request(index, query, fields, fuzzy, from, size)
    }

    fn parse_hits(&self, body: &Value) -> BackendResult<Vec<EngineHit>> {
        parse_hits(body)
    }

    fn index_request(&self, index: &str, id: &str, document: &Map<String, Value>) -> EngineRequest {
        index_request(index, id, document)
    }

    fn delete_request(&self, index: &str, id: &str) -> EngineRequest {
        delete_request(index, id)
    }

    /// `_bulk` takes NDJSON, which the JSON transport does not send.
    fn bulk_request(&self, _index: &str, _documents: &[Map<String, Value>]) -> Option<EngineRequest> {
        None
    }

    fn recreate_index_requests(&self, index: &str, model: &ModelSpec) -> Vec<EngineRequest> {
        recreate_index_requests(index, model)
    }

    fn health_request(&self) -> EngineRequest {
        EngineRequest::new(Method::Get, "/_cluster/health")
    }

    fn parse_health(&self, body: &Value) -> HealthStatus {
        parse_health(body)
    }
}

impl SearchEngine for OpenSearch {
    fn name(&self) -> &'static str {
        OPENSEARCH_BACKEND
    }

    fn relative_scores(&self) -> bool {
        true
    }

    /// OpenSearch expects base64 `user:password` credentials.
    fn authorization(&self, api_key: &str) -> String {
        format!("Basic {}", api_key)
    }

    fn search_request(
        &self,
        index: &str,
        query: &SearchQuery,
        fields: &[String],
        fuzzy: bool,
        from: usize,
        size: usize,
    ) -> EngineRequest {
        search_request(index, query, fields, fuzzy, from, size)
    }

    fn parse_hits(&self, body: &Value) -> BackendResult<Vec<EngineHit>> {
        parse_hits(body)
    }

    fn index_request(&self, index: &str, id: &str, document: &Map<String, Value>) -> EngineRequest {
        index_request(index, id, document)
    }

    fn delete_request(&self, index: &str, id: &str) -> EngineRequest {
        delete_request(index, id)
    }

    fn bulk_request(&self, _index: &str, _documents: &[Map<String, Value>]) -> Option<EngineRequest> {
        None
    }

    fn recreate_index_requests(&self, index: &str, model: &ModelSpec) -> Vec<EngineRequest> {
        recreate_index_requests(index, model)
    }

    fn health_request(&self) -> EngineRequest {
        EngineRequest::new(Method::Get, "/_cluster/health")
    }

    fn parse_health(&self, body: &Value) -> HealthStatus {
        parse_health(body)
    }
}
