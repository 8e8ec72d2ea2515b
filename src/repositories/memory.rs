use crate::domain::TenantId;
use crate::error::BackendResult;
use crate::models::{ModelSpec, Record};
use crate::repositories::traits::{RecordRepository, RepositoryCapabilities};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type Tables = HashMap<String, Vec<Record>>;

/// Record store held in process memory, keyed by model table.
///
/// Used for tests, benchmarks and the default local setup. Clones share
/// the same underlying rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record (matched by id within the model).
    pub fn upsert(&self, model: &ModelSpec, record: Record) {
        let mut tables = self.write();
        let rows = tables.entry(model.table.clone()).or_default();
        match rows.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
    }

    pub fn upsert_all(&self, model: &ModelSpec, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.upsert(model, record);
        }
    }

    pub fn remove(&self, model: &ModelSpec, id: &str) -> bool {
        let mut tables = self.write();
        let Some(rows) = tables.get_mut(&model.table) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|r| r.id != id);
        rows.len() != before
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn find_by_tenant(
        &self,
        model: &ModelSpec,
        tenant_id: &TenantId,
        active_only: bool,
    ) -> BackendResult<Vec<Record>> {
        let tables = self.read();
        Ok(tables
            .get(&model.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.tenant_id == tenant_id.as_str())
                    .filter(|r| !active_only || r.is_active)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_model(&self, model: &ModelSpec) -> BackendResult<Vec<Record>> {
        Ok(self.read().get(&model.table).cloned().unwrap_or_default())
    }

    async fn count_by_model(
        &self,
        model: &ModelSpec,
        tenant_id: Option<&TenantId>,
    ) -> BackendResult<usize> {
        let tables = self.read();
        Ok(tables
            .get(&model.table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| tenant_id.map_or(true, |t| r.tenant_id == t.as_str()))
                    .count()
            })
            .unwrap_or(0))
    }

    async fn ping(&self) -> BackendResult<()> {
        Ok(())
    }

    fn capabilities(&self) -> RepositoryCapabilities {
        RepositoryCapabilities {
            storage: "memory",
            trigram_similarity: true,
        }
    }
}
