//! Error types for the GROQ query client.
//!
//! # Design
//! One enum covers the whole request lifecycle: argument validation, the
//! transport round-trip, reading the body, and decoding the JSON. Non-2xx
//! responses get their own `Http` variant carrying the raw status and body,
//! because the query endpoint reports syntax and permission problems that
//! way and callers want the server's description verbatim.

use thiserror::Error;

/// Errors returned by `QueryClient` construction, build, parse, and fetch
/// methods.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A required construction or call argument is missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request could not be sent (DNS, TLS, connection refused, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be read to completion.
    #[error("failed to read response body: {0}")]
    Read(String),

    /// The body is not valid JSON or does not match the expected envelope.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl QueryError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        QueryError::Validation(msg.into())
    }
}
