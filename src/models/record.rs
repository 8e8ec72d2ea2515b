//! The narrow read contract the engine needs from domain data.

use super::result::value_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A searchable domain row: id, owner, active flag, named fields and an
/// optional last-modified timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub tenant_id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl Record {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            is_active: true,
            fields: BTreeMap::new(),
            updated_at: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = Some(at);
        self
    }

    /// Text of a field, `None` when absent or null.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::Null => None,
            value => Some(value_text(value)),
        }
    }

    /// Age in fractional days relative to `now`, if the record is timestamped.
    pub fn age_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.updated_at
            .map(|at| (now - at).num_seconds().max(0) as f64 / 86_400.0)
    }

    /// Result payload: the record's fields plus its id.
    pub fn payload(&self) -> Map<String, Value> {
        let mut data: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        data
    }

    /// Document shape pushed to external engines. Carries the tenant and the
    /// active flag so the engine can filter on them.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.payload();
        doc.insert("tenant_id".to_string(), Value::String(self.tenant_id.clone()));
        doc.insert("is_active".to_string(), Value::Bool(self.is_active));
        if let Some(at) = self.updated_at {
            doc.insert("updated_at".to_string(), Value::String(at.to_rfc3339()));
        }
        doc
    }

    /// Inverse of [`Record::to_document`].
    pub fn from_document(id: &str, doc: &Map<String, Value>) -> Option<Self> {
        let tenant_id = doc.get("tenant_id")?.as_str()?.to_string();
        let is_active = doc.get("is_active").and_then(Value::as_bool).unwrap_or(true);
        let updated_at = doc
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let fields = doc
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "id" | "tenant_id" | "is_active" | "updated_at"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self {
            id: id.to_string(),
            tenant_id,
            is_active,
            fields,
            updated_at,
        })
    }
}
