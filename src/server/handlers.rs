//! MCP tool handlers over [`SearchService`], using the rmcp `tool_router` pattern.

use crate::domain::RequestContext;
use crate::service::{SearchRequest, SearchService};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

/// MCP server exposing tenant-scoped record search.
#[derive(Clone)]
pub struct SearchMcpServer {
    service: Arc<SearchService>,
    tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for SearchMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "crm-search".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                title: None,
                website_url: None,
            },
            instructions: Some("Tenant-scoped search over CRM records (customers, contacts, leads, deals) with fuzzy ranking and GDPR masking.".into()),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchRecordsParams {
    query: String,
    tenant_id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
    #[serde(default)]
    models: Option<Vec<String>>,
    #[serde(default)]
    filters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    fuzzy: Option<bool>,
    #[serde(default)]
    max_results: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
    #[serde(default)]
    include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchSuggestionsParams {
    query: String,
    tenant_id: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
}

fn to_mcp_error(e: impl std::fmt::Display) -> McpError {
    McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn invalid_params(e: impl std::fmt::Display) -> McpError {
    McpError {
        code: ErrorCode::INVALID_PARAMS,
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn json_content(value: &impl serde::Serialize) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value).map_err(to_mcp_error)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

#[tool_router]
impl SearchMcpServer {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Search CRM records for one tenant.
    #[tool(
        description = "Search CRM records (customers, contacts, leads, deals) for one tenant. Fuzzy by default; results are ranked by relevance (0-100) and sensitive fields are masked unless the caller's role is allowed."
    )]
    async fn search_records(
        &self,
        params: Parameters<SearchRecordsParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        tracing::debug!(tenant_id = %params.tenant_id, "MCP Handler: search_records called");

        let mut request = SearchRequest::new(params.query, params.tenant_id)
            .user(params.user_id, params.user_role)
            .fuzzy(params.fuzzy.unwrap_or(true))
            .include_inactive(params.include_inactive.unwrap_or(false));
        if let Some(max_results) = params.max_results {
            request.max_results = max_results;
        }
        if let Some(offset) = params.offset {
            request.offset = offset;
        }
        if let Some(models) = params.models {
            request = request.models(models);
        }
        if let Some(filters) = params.filters {
            request.filters = filters;
        }

        let response = self.service.search(request).await.map_err(invalid_params)?;
        json_content(&response)
    }

    /// Type-ahead suggestions for one tenant.
    #[tool(
        description = "Return up to 20 type-ahead suggestions ({type, id, text, subtitle}) for a partial query. Empty for queries shorter than 2 characters."
    )]
    async fn search_suggestions(
        &self,
        params: Parameters<SearchSuggestionsParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;

        let mut ctx = RequestContext::new(params.tenant_id).map_err(invalid_params)?;
        if let Some(user_id) = params.user_id {
            ctx = ctx.with_user(user_id);
        }
        if let Some(role) = params.user_role {
            ctx = ctx.with_role(role);
        }

        let suggestions = self.service.record_suggestions(&params.query, &ctx).await;
        json_content(&serde_json::json!({ "suggestions": suggestions }))
    }

    /// Health of the active backend.
    #[tool(description = "Report the active search backend, its health status and whether GDPR filtering is enabled.")]
    async fn search_health(&self) -> Result<CallToolResult, McpError> {
        let health = self.service.health_check().await;
        json_content(&health)
    }
}
