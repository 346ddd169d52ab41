//! Blocking execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the seam between the pure build/parse core and the network.
//! `UreqTransport` is the bundled implementation; hosts with their own
//! connection pool implement the trait instead. Each `execute` call reads the
//! body to completion and drops the underlying response before returning, on
//! every path.

use tracing::trace;

use crate::error::QueryError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip. Non-2xx statuses are data, not errors.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, QueryError>;
}

/// `Transport` backed by a `ureq::Agent`.
///
/// The agent keeps ureq's default timeouts; callers needing a deadline can
/// pass their own configured agent through `with_agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a caller-configured agent. It should have `http_status_as_error`
    /// disabled so error bodies reach `parse_fetch`.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, QueryError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .call()
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        // ureq caps `read_to_string` at 10 MiB unless told otherwise; query
        // results over a whole dataset routinely exceed that.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| QueryError::Read(e.to_string()))?;
        trace!(status, bytes = body.len(), "response body read");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
