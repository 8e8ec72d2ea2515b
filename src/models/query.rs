//! The validated input to every search.

use crate::domain::TenantId;
use crate::error::{ValidationError, ValidationResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upper bound for `max_results`.
pub const MAX_RESULTS_LIMIT: usize = 1000;

/// Longest query string accepted.
pub const MAX_QUERY_LENGTH: usize = 500;

/// Sort key that means "rank by relevance only".
pub const SCORE_SORT_KEY: &str = "score";

/// Direction of the tie-breaking sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ValidationError::InvalidSortOrder(s.to_string())),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// A tenant-scoped free-text query.
///
/// Only obtainable through [`SearchQuery::builder`], so every instance a
/// backend sees has already passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    query_string: String,
    tenant_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_role: Option<String>,
    fuzzy: bool,
    max_results: usize,
    offset: usize,
    filters: BTreeMap<String, String>,
    sort_by: String,
    sort_order: SortOrder,
    include_inactive: bool,
    boost_fields: BTreeMap<String, f64>,
}

impl SearchQuery {
    pub fn builder(query_string: impl Into<String>, tenant_id: impl Into<String>) -> SearchQueryBuilder {
        SearchQueryBuilder::new(query_string, tenant_id)
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_role(&self) -> Option<&str> {
        self.user_role.as_deref()
    }

    pub fn fuzzy(&self) -> bool {
        self.fuzzy
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn sort_by(&self) -> &str {
        &self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// True when ties are broken by a record field rather than backend order.
    pub fn sorts_by_field(&self) -> bool {
        self.sort_by != SCORE_SORT_KEY
    }

    pub fn include_inactive(&self) -> bool {
        self.include_inactive
    }

    pub fn boost_fields(&self) -> &BTreeMap<String, f64> {
        &self.boost_fields
    }

    /// Number of ranked results a backend must produce so that the requested
    /// page can be cut from them.
    pub fn window(&self) -> usize {
        self.offset.saturating_add(self.max_results)
    }
}

/// Builder collecting raw, unvalidated inputs for a [`SearchQuery`].
#[derive(Debug, Clone)]
pub struct SearchQueryBuilder {
    query_string: String,
    tenant_id: String,
    user_id: Option<String>,
    user_role: Option<String>,
    fuzzy: bool,
    max_results: i64,
    offset: i64,
    filters: BTreeMap<String, String>,
    sort_by: Option<String>,
    sort_order: Option<String>,
    include_inactive: bool,
    boost_fields: BTreeMap<String, f64>,
}

impl SearchQueryBuilder {
    fn new(query_string: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            tenant_id: tenant_id.into(),
            user_id: None,
            user_role: None,
            fuzzy: true,
            max_results: 50,
            offset: 0,
            filters: BTreeMap::new(),
            sort_by: None,
            sort_order: None,
            include_inactive: false,
            boost_fields: BTreeMap::new(),
        }
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn user_role(mut self, user_role: Option<String>) -> Self {
        self.user_role = user_role;
        self
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn max_results(mut self, max_results: i64) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn filters(mut self, filters: BTreeMap<String, String>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn sort_order(mut self, order: impl Into<String>) -> Self {
        self.sort_order = Some(order.into());
        self
    }

    pub fn include_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }

    pub fn boost_field(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.boost_fields.insert(field.into(), weight);
        self
    }

    /// Validate every input and produce the immutable query.
    pub fn build(self) -> ValidationResult<SearchQuery> {
        let query_string = self.query_string.trim().to_string();
        if query_string.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if query_string.chars().count() > MAX_QUERY_LENGTH {
            return Err(ValidationError::QueryTooLong {
                max: MAX_QUERY_LENGTH,
            });
        }

        let tenant_id = TenantId::new(self.tenant_id)?;

        if self.max_results < 1 || self.max_results > MAX_RESULTS_LIMIT as i64 {
            return Err(ValidationError::MaxResultsOutOfRange {
                value: self.max_results,
                max: MAX_RESULTS_LIMIT,
            });
        }
        if self.offset < 0 {
            return Err(ValidationError::NegativeOffset(self.offset));
        }

        let sort_order = match self.sort_order {
            Some(order) => order.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };

        for (field, weight) in &self.boost_fields {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ValidationError::InvalidBoost {
                    field: field.clone(),
                    value: *weight,
                });
            }
        }

        let sort_by = self
            .sort_by
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SCORE_SORT_KEY.to_string());

        Ok(SearchQuery {
            query_string,
            tenant_id,
            user_id: self.user_id.filter(|u| !u.trim().is_empty()),
            user_role: self.user_role.filter(|r| !r.trim().is_empty()),
            fuzzy: self.fuzzy,
            max_results: self.max_results as usize,
            offset: self.offset as usize,
            filters: self.filters,
            sort_by,
            sort_order,
            include_inactive: self.include_inactive,
            boost_fields: self.boost_fields,
        })
    }
}
