//! Identity of the caller, as resolved by the surrounding application.

use super::TenantId;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Who is searching: the owning tenant plus the optional user id and role
/// consulted by the sensitivity filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
}

impl RequestContext {
    pub fn new(tenant_id: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            tenant_id: TenantId::new(tenant_id)?,
            user_id: None,
            user_role: None,
        })
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into()).filter(|u: &String| !u.trim().is_empty());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into()).filter(|r: &String| !r.trim().is_empty());
        self
    }
}
