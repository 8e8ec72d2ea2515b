//! HTTP surface over [`SearchService`].
//!
//! The caller's identity is resolved upstream and arrives in the
//! `x-tenant-id`, `x-user-id` and `x-user-role` headers.

use crate::domain::RequestContext;
use crate::error::ValidationError;
use crate::models::MAX_RESULTS_LIMIT;
use crate::service::{SearchRequest, SearchService, ServiceHealth, SuggestionEntry};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

/// Shortest `q` the search route accepts.
pub const MIN_QUERY_CHARS: usize = 2;

const DEFAULT_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

impl AppState {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/search/suggestions", get(suggestions))
        .route("/search/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until the listener fails.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening.");
    axum::serve(listener, router(state)).await
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    types: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    fuzzy: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    #[serde(rename = "type")]
    pub model: String,
    pub id: String,
    pub score: f64,
    pub data: Map<String, Value>,
    pub highlights: Value,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchBody {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_count: usize,
    pub pagination: Pagination,
    pub backend: String,
    pub execution_time_ms: f64,
    pub filters_applied: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionBody {
    pub suggestions: Vec<SuggestionEntry>,
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchBody>, ApiError> {
    let ctx = request_context(&headers)?;

    let q = params.q.unwrap_or_default();
    if q.trim().chars().count() < MIN_QUERY_CHARS {
        return Err(ValidationError::QueryTooShort {
            min: MIN_QUERY_CHARS,
        }
        .into());
    }

    let models = requested_types(&state.service, params.types.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = params.offset.unwrap_or(0);
    if limit < 1 || limit > MAX_RESULTS_LIMIT as i64 {
        return Err(ValidationError::MaxResultsOutOfRange {
            value: limit,
            max: MAX_RESULTS_LIMIT,
        }
        .into());
    }

    let mut request = SearchRequest::new(q.trim(), ctx.tenant_id.as_str())
        .user(ctx.user_id, ctx.user_role)
        .fuzzy(params.fuzzy.unwrap_or(true));
    if let Some(models) = models {
        request = request.models(models);
    }

    // One extra row tells whether another page exists. At the result cap
    // there is no room for it, so the next row is looked up separately.
    let at_cap = limit == MAX_RESULTS_LIMIT as i64;
    let window = if at_cap { limit } else { limit + 1 };
    let response = state
        .service
        .search(request.clone().page(window, offset))
        .await?;
    let mut has_more = response.results.len() as i64 > limit;
    if at_cap && response.results.len() as i64 == limit {
        let next = state.service.search(request.page(1, offset + limit)).await?;
        has_more = !next.results.is_empty();
    }
    let results: Vec<SearchHit> = response
        .results
        .into_iter()
        .take(limit as usize)
        .map(|r| SearchHit {
            score: r.score(),
            model: r.model,
            id: r.record_id,
            data: r.data,
            highlights: serde_json::to_value(r.highlights).unwrap_or(Value::Null),
        })
        .collect();

    Ok(Json(SearchBody {
        query: response.query.query_string().to_string(),
        total_count: results.len(),
        results,
        pagination: Pagination {
            offset,
            limit,
            has_more,
        },
        backend: response.backend,
        execution_time_ms: response.execution_time_ms,
        filters_applied: response.filters_applied,
    }))
}

async fn suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionBody>, ApiError> {
    let ctx = request_context(&headers)?;
    let suggestions = state.service.record_suggestions(&params.q, &ctx).await;
    Ok(Json(SuggestionBody { suggestions }))
}

async fn health(State(state): State<AppState>) -> Json<ServiceHealth> {
    Json(state.service.health_check().await)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn request_context(headers: &HeaderMap) -> Result<RequestContext, ApiError> {
    let tenant = header(headers, TENANT_HEADER).ok_or_else(|| {
        json_error(
            StatusCode::BAD_REQUEST,
            "missing_tenant",
            format!("The {TENANT_HEADER} header is required."),
            Some(vec![TENANT_HEADER.to_string()]),
        )
    })?;

    let mut ctx = RequestContext::new(tenant)?;
    if let Some(user) = header(headers, USER_HEADER) {
        ctx = ctx.with_user(user);
    }
    if let Some(role) = header(headers, ROLE_HEADER) {
        ctx = ctx.with_role(role);
    }
    Ok(ctx)
}

/// Parse the comma-separated `types` list; `None` means every model.
fn requested_types(
    service: &SearchService,
    types: Option<&str>,
) -> Result<Option<Vec<String>>, ApiError> {
    let Some(types) = types else {
        return Ok(None);
    };
    let requested: Vec<String> = types
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    if requested.is_empty() {
        return Ok(None);
    }

    let unknown: Vec<String> = requested
        .iter()
        .filter(|t| service.catalog().get(t).is_none())
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "unknown_type",
            format!(
                "Unknown entity type(s): {}. Expected one of: {}.",
                unknown.join(", "),
                service.catalog().names().join(", ")
            ),
            Some(unknown),
        ));
    }
    Ok(Some(requested))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
    fields: Option<Vec<String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    fields: Option<Vec<String>>,
) -> ApiError {
    ApiError {
        status,
        error_code: code.to_string(),
        message: message.into(),
        fields,
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::MissingTenant => "missing_tenant",
            ValidationError::UnknownModel(_) => "unknown_type",
            _ => "invalid_request",
        };
        json_error(StatusCode::BAD_REQUEST, code, err.to_string(), None)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
            fields: self.fields,
        };
        (self.status, Json(body)).into_response()
    }
}
