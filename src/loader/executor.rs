//! The blocking half of a load: turning a `Request` into a `Response`.
//!
//! Executors never return errors. Anything that goes wrong on the wire is
//! folded into the `Response` so the worker always has exactly one value to
//! hand back to the owner thread.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::types::{HttpVerb, LoadError, Request, Response};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("restloader/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait Executor: Send + Sync {
    /// Returns the name of the executor, for logs.
    fn name(&self) -> &str;

    /// Performs the request. Failures come back as a non-success `Response`.
    async fn execute(&self, request: &Request) -> Response;
}

/// reqwest-backed executor.
pub struct HttpExecutor {
    client: reqwest::Client,
}

impl HttpExecutor {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });
        Self { client }
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    fn name(&self) -> &str {
        "http"
    }

    async fn execute(&self, request: &Request) -> Response {
        let method = match request.verb() {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Delete => reqwest::Method::DELETE,
        };

        let builder = self.client.request(method, request.uri());
        let builder = if request.verb().uses_query() {
            builder.query(request.params())
        } else {
            builder.form(request.params())
        };

        info!(
            "Executing {} {} ({} params)",
            request.verb(),
            request.uri(),
            request.params().len()
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} {} failed: {}", request.verb(), request.uri(), e);
                return Response::transport_failure(e.to_string());
            }
        };

        let status = response.status().as_u16();
        debug!("{} {} -> HTTP {}", request.verb(), request.uri(), status);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read response body (HTTP {}): {}", status, e);
                return Response {
                    status,
                    body: String::new(),
                    failure: Some(LoadError::Transport(e.to_string())),
                };
            }
        };

        let response = Response::new(status, body);
        if let Some(failure) = &response.failure {
            warn!("{} {}: {}", request.verb(), request.uri(), failure);
        }
        response
    }
}
