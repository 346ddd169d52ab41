//! Synchronous GROQ query client for the Sanity content API.
//!
//! # Overview
//! Builds `HttpRequest` values for `GET /{apiVersion}/data/query/{dataset}`
//! and parses the `HttpResponse` values that come back. The round-trip itself
//! goes through a `Transport`: the bundled ureq-backed one, or whatever the
//! host supplies.
//!
//! # Design
//! - `QueryClient` is immutable after construction; `update` and the `with_*`
//!   builders return new values.
//! - Each operation is split into `build_*` and `parse_fetch`, so the I/O
//!   boundary is explicit and the FFI crate can expose it 1:1.
//! - The query and every parameter are percent-encoded; parameter values are
//!   sent as GROQ literals.
//! - No retries, caching, or timeouts. Failures go straight to the caller.

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::QueryClient;
pub use config::{ClientConfig, ConfigUpdate};
pub use error::QueryError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{QueryOutput, QueryParams, ResponseMode};
