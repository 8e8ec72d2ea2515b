use async_trait::async_trait;
use crm_search::client::{EngineTransport, Method};
use crm_search::error::BackendResult;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Meilisearch stand-in serving a fixed hit list, honouring `offset` and
/// `limit` the way the real engine does.
#[derive(Clone)]
pub struct PagedMeilisearch {
    hits: Arc<Vec<Value>>,
    requests: Arc<Mutex<Vec<(usize, usize)>>>,
}

impl PagedMeilisearch {
    pub fn new(hits: Vec<Value>) -> Self {
        Self {
            hits: Arc::new(hits),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `(offset, limit)` of every search request received.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineTransport for PagedMeilisearch {
    async fn send(&self, _method: Method, _path: &str, body: Option<Value>) -> BackendResult<Value> {
        let body = body.unwrap_or_default();
        let offset = body["offset"].as_u64().unwrap_or(0) as usize;
        let limit = body["limit"].as_u64().unwrap_or(20) as usize;
        self.requests.lock().unwrap().push((offset, limit));

        let page: Vec<Value> = self.hits.iter().skip(offset).take(limit).cloned().collect();
        Ok(json!({ "hits": page }))
    }

    fn endpoint(&self) -> &str {
        "paged://"
    }
}
