use crate::domain::TenantId;
use crate::error::BackendResult;
use crate::models::{ModelSpec, Record};
use async_trait::async_trait;
use serde::Serialize;

/// What the underlying store can do, reported by health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepositoryCapabilities {
    /// Storage engine label
    pub storage: &'static str,

    /// Whether trigram similarity is available for fuzzy search
    pub trigram_similarity: bool,
}

/// Read contract the relational backend needs from domain data.
///
/// Every row-returning method is tenant-scoped except [`RecordRepository::list_model`],
/// which exists only for re-feeding external indexes.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Rows of one model owned by `tenant_id`, optionally only active ones.
    async fn find_by_tenant(
        &self,
        model: &ModelSpec,
        tenant_id: &TenantId,
        active_only: bool,
    ) -> BackendResult<Vec<Record>>;

    /// Every row of a model across tenants.
    async fn list_model(&self, model: &ModelSpec) -> BackendResult<Vec<Record>>;

    /// Row count for a model, optionally restricted to one tenant.
    async fn count_by_model(
        &self,
        model: &ModelSpec,
        tenant_id: Option<&TenantId>,
    ) -> BackendResult<usize>;

    /// Cheap round trip proving the store is reachable.
    async fn ping(&self) -> BackendResult<()>;

    fn capabilities(&self) -> RepositoryCapabilities;
}
