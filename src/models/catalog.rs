//! Which entity types are searchable, and over which fields.

use crate::error::{ValidationError, ValidationResult};
use serde::Serialize;

/// Search metadata for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSpec {
    /// Entity type name used in queries and results
    pub name: String,

    /// Backing table in the relational store
    pub table: String,

    /// Fields matched against the query string
    pub searchable_fields: Vec<String>,

    /// Fields joined (space-separated) to form a display label
    pub title_fields: Vec<String>,

    /// Secondary display field
    pub subtitle_field: Option<String>,
}

impl ModelSpec {
    pub fn new(name: &str, table: &str, searchable_fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            searchable_fields: searchable_fields.iter().map(|f| f.to_string()).collect(),
            title_fields: vec!["name".to_string()],
            subtitle_field: None,
        }
    }

    pub fn titled(mut self, title_fields: &[&str], subtitle_field: Option<&str>) -> Self {
        self.title_fields = title_fields.iter().map(|f| f.to_string()).collect();
        self.subtitle_field = subtitle_field.map(str::to_string);
        self
    }

    pub fn is_searchable(&self, field: &str) -> bool {
        self.searchable_fields.iter().any(|f| f == field)
    }
}

/// The fixed set of searchable entity types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    /// Customers, contacts, leads and deals.
    pub fn crm() -> Self {
        Self::new(vec![
            ModelSpec::new(
                "customer",
                "customers",
                &["name", "email", "phone", "company_name", "industry", "website", "notes"],
            )
            .titled(&["name"], Some("company_name")),
            ModelSpec::new(
                "contact",
                "contacts",
                &["first_name", "last_name", "email", "phone", "mobile", "title", "notes"],
            )
            .titled(&["first_name", "last_name"], Some("title")),
            ModelSpec::new(
                "lead",
                "leads",
                &["name", "email", "phone", "company", "source", "status", "notes"],
            )
            .titled(&["name"], Some("company")),
            ModelSpec::new("deal", "deals", &["name", "description", "stage", "notes"])
                .titled(&["name"], Some("stage")),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    /// The models a search should cover: all of them when none are named,
    /// otherwise the named ones in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownModel` for the first unknown name.
    pub fn resolve(&self, requested: Option<&[String]>) -> ValidationResult<Vec<&ModelSpec>> {
        let Some(requested) = requested.filter(|r| !r.is_empty()) else {
            return Ok(self.models.iter().collect());
        };
        for name in requested {
            if self.get(name).is_none() {
                return Err(ValidationError::UnknownModel(name.clone()));
            }
        }
        Ok(self
            .models
            .iter()
            .filter(|m| requested.iter().any(|r| r == &m.name))
            .collect())
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::crm()
    }
}
