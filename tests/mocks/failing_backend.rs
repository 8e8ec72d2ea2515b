use async_trait::async_trait;
use crm_search::backends::{HealthReport, HealthStatus, SearchBackend};
use crm_search::models::{Record, SearchQuery, SearchResult};
use crm_search::TenantId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How every operation of a [`FailingBackend`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureMode {
    Panic,
    Hang(Duration),
}

/// Backend whose operations panic or never finish in time.
#[derive(Clone)]
pub struct FailingBackend {
    mode: FailureMode,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

impl FailingBackend {
    pub const NAME: &'static str = "failing";

    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get_call_count(&self, method: &str) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(method).unwrap_or(&0)
    }

    async fn misbehave<T>(&self, method: &str) -> T {
        *self
            .call_counts
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_insert(0) += 1;
        match self.mode {
            FailureMode::Panic => panic!("{} exploded", method),
            FailureMode::Hang(d) => {
                tokio::time::sleep(d).await;
                panic!("{} should have been abandoned", method)
            }
        }
    }
}

#[async_trait]
impl SearchBackend for FailingBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn search(&self, _query: &SearchQuery, _models: Option<&[String]>) -> Vec<SearchResult> {
        self.misbehave("search").await
    }

    async fn index_record(&self, _model: &str, _record: &Record) -> bool {
        self.misbehave("index_record").await
    }

    async fn delete_record(&self, _model: &str, _record_id: &str) -> bool {
        self.misbehave("delete_record").await
    }

    async fn bulk_index(&self, _model: &str, _records: &[Record]) -> usize {
        self.misbehave("bulk_index").await
    }

    async fn rebuild_index(&self, _models: Option<&[String]>) -> bool {
        self.misbehave("rebuild_index").await
    }

    async fn get_suggestions(
        &self,
        _prefix: &str,
        _field: &str,
        _limit: usize,
        _tenant_id: &TenantId,
    ) -> Vec<String> {
        self.misbehave("get_suggestions").await
    }

    async fn health_check(&self) -> HealthReport {
        if self.mode == FailureMode::Panic {
            return HealthReport::new(HealthStatus::Unhealthy);
        }
        self.misbehave("health_check").await
    }
}
