//! Field classification and the GDPR filter applied to search results.

use super::masking::mask_value;
use crate::error::{ConfigError, ConfigResult};
use crate::models::SearchResult;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;

const PII_FIELDS: &[&str] = &[
    "email",
    "email_address",
    "personal_email",
    "work_email",
    "phone",
    "phone_number",
    "mobile",
    "mobile_phone",
    "fax",
    "birth_date",
    "date_of_birth",
    "dob",
    "ssn",
    "social_security_number",
    "tax_id",
    "national_id",
    "passport_number",
    "drivers_license",
    "bank_account",
    "account_number",
    "iban",
    "routing_number",
    "credit_card",
    "credit_card_number",
];

const PHI_FIELDS: &[&str] = &[
    "medical_record_number",
    "medical_history",
    "health_conditions",
    "diagnosis",
    "medications",
    "allergies",
    "blood_type",
    "insurance_id",
    "health_insurance_number",
    "treatment_notes",
];

const ADDRESS_FIELDS: &[&str] = &[
    "address",
    "street",
    "street_address",
    "address_line1",
    "address_line2",
    "billing_address",
    "shipping_address",
    "mailing_address",
    "home_address",
];

/// Sensitivity class of a payload field. The three sensitive sets are
/// disjoint; everything else is public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldSensitivity {
    Public,
    Pii,
    Phi,
    Address,
}

impl fmt::Display for FieldSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Public => "PUBLIC",
            Self::Pii => "PII",
            Self::Phi => "PHI",
            Self::Address => "ADDRESS",
        };
        write!(f, "{}", label)
    }
}

/// Static classification by field name (case-insensitive).
pub fn classify_field(field: &str) -> FieldSensitivity {
    let field = field.to_ascii_lowercase();
    if PII_FIELDS.contains(&field.as_str()) {
        FieldSensitivity::Pii
    } else if PHI_FIELDS.contains(&field.as_str()) {
        FieldSensitivity::Phi
    } else if ADDRESS_FIELDS.contains(&field.as_str()) {
        FieldSensitivity::Address
    } else {
        FieldSensitivity::Public
    }
}

/// Masking/removal policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GdprConfig {
    /// Service-level switch; when false the facade never filters
    pub enabled: bool,
    pub mask_pii: bool,
    pub remove_pii: bool,
    pub mask_phi: bool,
    pub remove_phi: bool,
    pub mask_addresses: bool,
    /// Users whose results are never filtered
    pub allowed_users: BTreeSet<String>,
    /// Roles whose results are never filtered
    pub allowed_roles: BTreeSet<String>,
}

impl Default for GdprConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mask_pii: true,
            remove_pii: false,
            mask_phi: true,
            remove_phi: false,
            mask_addresses: false,
            allowed_users: BTreeSet::new(),
            allowed_roles: ["admin".to_string()].into_iter().collect(),
        }
    }
}

impl GdprConfig {
    /// Masking and removal are mutually exclusive per category.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.mask_pii && self.remove_pii {
            return Err(ConfigError::InvalidValue {
                var: "gdpr.pii".to_string(),
                reason: "mask_pii and remove_pii are mutually exclusive".to_string(),
            });
        }
        if self.mask_phi && self.remove_phi {
            return Err(ConfigError::InvalidValue {
                var: "gdpr.phi".to_string(),
                reason: "mask_phi and remove_phi are mutually exclusive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Keep,
    Mask,
    Remove,
}

/// Applies a [`GdprConfig`] to result payloads.
#[derive(Debug, Clone)]
pub struct SensitivityFilter {
    config: GdprConfig,
}

impl SensitivityFilter {
    pub fn new(config: GdprConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GdprConfig {
        &self.config
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Allowed users and allowed roles see payloads unfiltered. This is the
    /// only way to switch filtering off for a request.
    pub fn is_bypassed(&self, user_id: Option<&str>, user_role: Option<&str>) -> bool {
        user_id.is_some_and(|u| self.config.allowed_users.contains(u))
            || user_role.is_some_and(|r| self.config.allowed_roles.contains(r))
    }

    /// Return a filtered copy of `data` for the given requester.
    pub fn filter_result(
        &self,
        data: &Map<String, Value>,
        user_id: Option<&str>,
        user_role: Option<&str>,
    ) -> Map<String, Value> {
        if self.is_bypassed(user_id, user_role) {
            return data.clone();
        }
        self.apply(data)
    }

    /// Filter a search result in place, including its highlights. Returns
    /// whether filtering was applied (false when the requester bypasses it).
    pub fn filter_search_result(
        &self,
        result: &mut SearchResult,
        user_id: Option<&str>,
        user_role: Option<&str>,
    ) -> bool {
        if self.is_bypassed(user_id, user_role) {
            return false;
        }

        result.data = self.apply(&result.data);

        let fields: Vec<String> = result.highlights.keys().cloned().collect();
        for field in fields {
            let sensitivity = classify_field(&field);
            match self.action_for(sensitivity) {
                Action::Keep => {}
                Action::Remove => {
                    result.highlights.remove(&field);
                }
                Action::Mask => {
                    if let Some(snippets) = result.highlights.get_mut(&field) {
                        for snippet in snippets.iter_mut() {
                            let masked = mask_value(
                                &field,
                                &Value::String(snippet.clone()),
                                sensitivity == FieldSensitivity::Address,
                            );
                            *snippet = masked.as_str().unwrap_or("***").to_string();
                        }
                    }
                }
            }
        }

        result.pii_filtered = true;
        true
    }

    /// Filter suggestion values drawn from one field. Values that mask to
    /// the same text are returned once.
    pub fn filter_field_values(
        &self,
        field: &str,
        values: Vec<String>,
        user_id: Option<&str>,
        user_role: Option<&str>,
    ) -> Vec<String> {
        if self.is_bypassed(user_id, user_role) {
            return values;
        }

        let sensitivity = classify_field(field);
        match self.action_for(sensitivity) {
            Action::Keep => values,
            Action::Remove => Vec::new(),
            Action::Mask => {
                let is_address = sensitivity == FieldSensitivity::Address;
                let mut seen = BTreeSet::new();
                values
                    .into_iter()
                    .filter_map(|v| {
                        mask_value(field, &Value::String(v), is_address)
                            .as_str()
                            .map(str::to_string)
                    })
                    .filter(|v| seen.insert(v.clone()))
                    .collect()
            }
        }
    }

    /// Annotate each field with its classification, without masking.
    pub fn tag_sensitivity(&self, data: &Map<String, Value>) -> Map<String, Value> {
        data.iter()
            .map(|(field, value)| {
                (
                    field.clone(),
                    json!({
                        "value": value,
                        "sensitivity": classify_field(field).to_string(),
                    }),
                )
            })
            .collect()
    }

    fn apply(&self, data: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (field, value) in data {
            let sensitivity = classify_field(field);
            match self.action_for(sensitivity) {
                Action::Keep => {
                    out.insert(field.clone(), value.clone());
                }
                Action::Mask => {
                    let is_address = sensitivity == FieldSensitivity::Address;
                    out.insert(field.clone(), mask_value(field, value, is_address));
                }
                Action::Remove => {}
            }
        }
        out
    }

    fn action_for(&self, sensitivity: FieldSensitivity) -> Action {
        match sensitivity {
            FieldSensitivity::Public => Action::Keep,
            FieldSensitivity::Pii if self.config.remove_pii => Action::Remove,
            FieldSensitivity::Pii if self.config.mask_pii => Action::Mask,
            FieldSensitivity::Phi if self.config.remove_phi => Action::Remove,
            FieldSensitivity::Phi if self.config.mask_phi => Action::Mask,
            FieldSensitivity::Address if self.config.mask_addresses => Action::Mask,
            _ => Action::Keep,
        }
    }
}
