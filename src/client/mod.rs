//! HTTP client for external search engines.
//!
//! This module provides a synchronous JSON client that is called from async
//! contexts via `tokio::task::spawn_blocking` (see [`AsyncEngineClient`]).
//! The client knows nothing about any particular engine; adapters build
//! paths and bodies and interpret the JSON that comes back.

mod async_wrapper;
pub use async_wrapper::{AsyncEngineClient, EngineTransport};

use crate::error::{BackendError, BackendResult};
use crate::metrics::{EngineTimer, Metrics};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// HTTP verbs used by engine adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking JSON client bound to one engine base URL.
#[derive(Clone)]
pub struct EngineHttpClient {
    /// Base URL of the engine
    base_url: String,

    /// Authorization header value, if the engine needs one
    authorization: Option<String>,

    /// HTTP client agent
    agent: Arc<ureq::Agent>,

    /// Metrics collector
    metrics: Metrics,
}

impl fmt::Debug for EngineHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHttpClient")
            .field("base_url", &self.base_url)
            .field("authorization", &self.authorization.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl EngineHttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, metrics: Metrics) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Self {
            base_url: base_url.into(),
            authorization: None,
            agent: Arc::new(agent),
            metrics,
        }
    }

    /// Send `Authorization: <value>` on every request.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Build a full URL from a path.
    fn build_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Execute a request and parse the JSON body. An empty body yields `Value::Null`.
    pub fn request(&self, method: Method, path: &str, body: Option<&Value>) -> BackendResult<Value> {
        let timer = EngineTimer::new(self.metrics.clone());
        let url = self.build_url(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .agent
            .request(method.as_str(), &url)
            .set("Content-Type", "application/json");
        if let Some(auth) = &self.authorization {
            request = request.set("Authorization", auth);
        }

        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let err = map_error(e);
                tracing::debug!("{} {} - Error: {}", method, url, err);
                timer.complete_with_error();
                return Err(err);
            }
        };

        let text = match response.into_string() {
            Ok(text) => text,
            Err(e) => {
                timer.complete_with_error();
                return Err(BackendError::Http(e.to_string()));
            }
        };
        timer.complete();

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub fn get(&self, path: &str) -> BackendResult<Value> {
        self.request(Method::Get, path, None)
    }

    pub fn post(&self, path: &str, body: &Value) -> BackendResult<Value> {
        self.request(Method::Post, path, Some(body))
    }

    pub fn put(&self, path: &str, body: &Value) -> BackendResult<Value> {
        self.request(Method::Put, path, Some(body))
    }

    pub fn delete(&self, path: &str) -> BackendResult<Value> {
        self.request(Method::Delete, path, None)
    }
}

/// Map a ureq error to a BackendError.
fn map_error(error: ureq::Error) -> BackendError {
    match error {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_string()
                .unwrap_or_else(|_| "Unknown error".to_string());
            BackendError::Engine { status, message }
        }
        ureq::Error::Transport(transport) => {
            if transport.kind() == ureq::ErrorKind::ConnectionFailed {
                BackendError::Http("Connection failed".to_string())
            } else {
                BackendError::Http(transport.to_string())
            }
        }
    }
}
