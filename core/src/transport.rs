//! Execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the seam between the pure request/response code and the
//! network. `UreqTransport` drives a blocking `ureq` agent on tokio's blocking
//! pool so the async caller never stalls. Non-2xx statuses come back as data;
//! only failures to obtain a response become `RequestError::Transport`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs a single HTTP round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        (**self).execute(request).await
    }
}

/// Largest response body read by default. Photos travel inline as data URIs,
/// so a pet list easily outgrows ureq's own 10 MiB cap.
pub const DEFAULT_BODY_LIMIT: u64 = 512 * 1024 * 1024;

/// `Transport` backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// `timeout` bounds the whole round trip, connect through body.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        // 4xx/5xx must reach PetClient as responses, not errors.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Cap on the bytes read from a single response body.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn body_limit(&self) -> u64 {
        self.body_limit
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let agent = self.agent.clone();
        let body_limit = self.body_limit;
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request, body_limit))
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?
            .map_err(|e| RequestError::Transport(e.to_string()))
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn execute_blocking(
    agent: &ureq::Agent,
    req: HttpRequest,
    body_limit: u64,
) -> Result<HttpResponse, ureq::Error> {
    let headers = &req.headers;
    let mut response = match (req.method, req.body.as_deref()) {
        (HttpMethod::Get, _) => with_headers(agent.get(&req.path), headers).call(),
        (HttpMethod::Delete, _) => with_headers(agent.delete(&req.path), headers).call(),
        (HttpMethod::Post, Some(body)) => {
            with_headers(agent.post(&req.path), headers).send(body.as_bytes())
        }
        (HttpMethod::Post, None) => with_headers(agent.post(&req.path), headers).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            with_headers(agent.put(&req.path), headers).send(body.as_bytes())
        }
        (HttpMethod::Put, None) => with_headers(agent.put(&req.path), headers).send_empty(),
        (HttpMethod::Patch, Some(body)) => {
            with_headers(agent.patch(&req.path), headers).send(body.as_bytes())
        }
        (HttpMethod::Patch, None) => with_headers(agent.patch(&req.path), headers).send_empty(),
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (key.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_string()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
