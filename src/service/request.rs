//! Inputs and outputs of the service facade that are not plain schemas.

use crate::backends::HealthStatus;
use crate::models::{SearchQuery, SearchResult};
use crate::models::query::SearchQueryBuilder;
use crate::models::result::value_text;
use crate::models::ModelSpec;
use crate::error::ValidationResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_max_results() -> i64 {
    50
}

/// One search call as received by the facade, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub tenant_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    /// Entity types to search; all when absent
    #[serde(default)]
    pub models: Option<Vec<String>>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub fuzzy: bool,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub boost_fields: BTreeMap<String, f64>,
    #[serde(default = "default_true")]
    pub apply_gdpr: bool,
    /// Overrides the service deadline for this call
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            tenant_id: tenant_id.into(),
            user_id: None,
            user_role: None,
            models: None,
            filters: BTreeMap::new(),
            fuzzy: true,
            max_results: default_max_results(),
            offset: 0,
            sort_by: None,
            sort_order: None,
            include_inactive: false,
            boost_fields: BTreeMap::new(),
            apply_gdpr: true,
            timeout: None,
        }
    }

    pub fn user(mut self, user_id: Option<String>, user_role: Option<String>) -> Self {
        self.user_id = user_id;
        self.user_role = user_role;
        self
    }

    pub fn models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn page(mut self, max_results: i64, offset: i64) -> Self {
        self.max_results = max_results;
        self.offset = offset;
        self
    }

    pub fn include_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }

    pub fn apply_gdpr(mut self, apply_gdpr: bool) -> Self {
        self.apply_gdpr = apply_gdpr;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate into a [`SearchQuery`].
    pub fn to_query(&self) -> ValidationResult<SearchQuery> {
        let mut builder: SearchQueryBuilder = SearchQuery::builder(&self.query, &self.tenant_id)
            .user_id(self.user_id.clone())
            .user_role(self.user_role.clone())
            .fuzzy(self.fuzzy)
            .max_results(self.max_results)
            .offset(self.offset)
            .filters(self.filters.clone())
            .include_inactive(self.include_inactive);
        if let Some(sort_by) = &self.sort_by {
            builder = builder.sort_by(sort_by.clone());
        }
        if let Some(sort_order) = &self.sort_order {
            builder = builder.sort_order(sort_order.clone());
        }
        for (field, weight) in &self.boost_fields {
            builder = builder.boost_field(field.clone(), *weight);
        }
        builder.build()
    }
}

/// Compact record hit for type-ahead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionEntry {
    #[serde(rename = "type")]
    pub model: String,
    pub id: String,
    pub text: String,
    pub subtitle: Option<String>,
}

impl SuggestionEntry {
    /// Label a result with its model's title and subtitle fields.
    pub fn from_result(spec: &ModelSpec, result: &SearchResult) -> Self {
        let text = spec
            .title_fields
            .iter()
            .filter_map(|f| field_text(&result.data, f))
            .collect::<Vec<_>>()
            .join(" ");
        let subtitle = spec
            .subtitle_field
            .as_ref()
            .and_then(|f| field_text(&result.data, f));

        Self {
            model: result.model.clone(),
            id: result.record_id.clone(),
            text,
            subtitle,
        }
    }
}

fn field_text(data: &Map<String, Value>, field: &str) -> Option<String> {
    data.get(field)
        .filter(|v| !v.is_null())
        .map(value_text)
        .filter(|s| !s.trim().is_empty())
}

/// Aggregated health of the service and its active backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    pub backend: String,
    pub status: HealthStatus,
    pub details: Map<String, Value>,
    pub gdpr_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::ModelCatalog;
    use serde_json::json;

    #[test]
    fn test_deserialize_applies_defaults() {
        let request: SearchRequest =
            serde_json::from_value(json!({"query": "acme", "tenant_id": "t1"})).unwrap();
        assert!(request.fuzzy);
        assert!(request.apply_gdpr);
        assert_eq!(request.max_results, 50);
        assert_eq!(request, SearchRequest::new("acme", "t1"));
    }

    #[test]
    fn test_to_query_validates() {
        let err = SearchRequest::new("acme", "t1").page(0, 0).to_query().unwrap_err();
        assert!(matches!(err, ValidationError::MaxResultsOutOfRange { .. }));

        let mut request = SearchRequest::new("acme", "t1");
        request.sort_order = Some("sideways".to_string());
        assert!(matches!(
            request.to_query(),
            Err(ValidationError::InvalidSortOrder(_))
        ));
    }

    #[test]
    fn test_suggestion_entry_from_result() {
        let catalog = ModelCatalog::crm();
        let contact = catalog.get("contact").unwrap();
        let mut data = Map::new();
        data.insert("first_name".to_string(), json!("Ada"));
        data.insert("last_name".to_string(), json!("Lovelace"));
        data.insert("title".to_string(), json!("CTO"));
        let result = SearchResult::new("contact", "c1", 80.0).with_data(data);

        let entry = SuggestionEntry::from_result(contact, &result);
        assert_eq!(entry.text, "Ada Lovelace");
        assert_eq!(entry.subtitle.as_deref(), Some("CTO"));
        assert_eq!(
            serde_json::to_value(&entry).unwrap()["type"],
            json!("contact")
        );
    }
}
