//! Async wrapper around the synchronous [`EngineHttpClient`].
//!
//! HTTP calls run on tokio's blocking pool so they never stall the runtime.

use crate::client::{EngineHttpClient, Method};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Transport seam between engine adapters and the network.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> BackendResult<Value>;

    /// Where requests go; reported by health checks.
    fn endpoint(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct AsyncEngineClient {
    client: Arc<EngineHttpClient>,
}

impl AsyncEngineClient {
    pub fn new(client: EngineHttpClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl EngineTransport for AsyncEngineClient {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> BackendResult<Value> {
        let client = self.client.clone();
        let path = path.to_string();

        tokio::task::spawn_blocking(move || client.request(method, &path, body.as_ref()))
            .await
            .map_err(|e| BackendError::Http(format!("Task join error: {}", e)))?
    }

    fn endpoint(&self) -> &str {
        self.client.base_url()
    }
}
