//! GROQ query client: request builder, response parser, and blocking fetch.
//!
//! # Design
//! `QueryClient` holds only validated configuration and carries no mutable
//! state between calls. Every operation is split into a `build_*` method that
//! produces an `HttpRequest` and `parse_fetch`, which consumes the
//! `HttpResponse`. The `fetch*` / `get_document*` wrappers glue the two
//! together over a `Transport`; nothing is retried.

use serde_json::Value;
use tracing::debug;

use crate::config::{ClientConfig, ConfigUpdate};
use crate::encoding::encode_query_string;
use crate::error::QueryError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{QueryOutput, QueryParams, ResponseMode};

const DOCUMENT_BY_ID: &str = "*[_id == $id][0]";
const DOCUMENTS_BY_IDS: &str = "*[_id in $ids]";

/// Synchronous, stateless client for one project/dataset.
///
/// Cloning yields a fully independent value; `update` and the `with_*`
/// builders return new clients rather than changing this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClient {
    config: ClientConfig,
}

impl QueryClient {
    /// Create a client. Empty `token` means unauthenticated; empty
    /// `api_version` means `v` + today's date, fixed from here on.
    pub fn new(
        project_id: &str,
        dataset: &str,
        token: &str,
        api_version: &str,
    ) -> Result<Self, QueryError> {
        Self::from_config(ClientConfig {
            token: Some(token.to_string()),
            api_version: Some(api_version.to_string()),
            ..ClientConfig::new(project_id, dataset)
        })
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, QueryError> {
        Ok(Self {
            config: config.normalize()?,
        })
    }

    /// A copy with the given fields replaced. The copy is validated exactly
    /// like a freshly constructed client; `self` is untouched.
    pub fn update(&self, update: ConfigUpdate) -> Result<Self, QueryError> {
        Self::from_config(self.config.merged(update))
    }

    pub fn with_api_host(self, api_host: &str) -> Self {
        let api_host = api_host.trim_end_matches('/');
        let mut config = self.config;
        config.api_host = (!api_host.is_empty()).then(|| api_host.to_string());
        Self { config }
    }

    pub fn with_response_mode(self, response_mode: ResponseMode) -> Self {
        let mut config = self.config;
        config.response_mode = response_mode;
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    pub fn dataset(&self) -> &str {
        &self.config.dataset
    }

    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    pub fn api_version(&self) -> &str {
        self.config.api_version.as_deref().unwrap_or_default()
    }

    pub fn response_mode(&self) -> ResponseMode {
        self.config.response_mode
    }

    /// `https://{project_id}.api.sanity.io` unless overridden.
    pub fn base_url(&self) -> String {
        match &self.config.api_host {
            Some(host) => host.clone(),
            None => format!("https://{}.api.sanity.io", self.config.project_id),
        }
    }

    fn query_endpoint(&self) -> String {
        format!(
            "{}/{}/data/query/{}",
            self.base_url(),
            self.api_version(),
            self.config.dataset
        )
    }

    pub fn build_fetch(
        &self,
        query: &str,
        params: Option<&QueryParams>,
    ) -> Result<HttpRequest, QueryError> {
        if query.is_empty() {
            return Err(QueryError::validation("please provide a query"));
        }

        let url = format!(
            "{}?{}",
            self.query_endpoint(),
            encode_query_string(query, params)?
        );

        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        if let Some(token) = &self.config.token {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url,
            headers,
        })
    }

    pub fn build_get_document(&self, document_id: &str) -> Result<HttpRequest, QueryError> {
        if document_id.is_empty() {
            return Err(QueryError::validation("document id is required"));
        }
        let params = QueryParams::from([("id".to_string(), Value::from(document_id))]);
        self.build_fetch(DOCUMENT_BY_ID, Some(&params))
    }

    pub fn build_get_documents<S: AsRef<str>>(
        &self,
        document_ids: &[S],
    ) -> Result<HttpRequest, QueryError> {
        let ids: Vec<&str> = document_ids.iter().map(AsRef::as_ref).collect();
        let params = QueryParams::from([("ids".to_string(), Value::from(ids))]);
        self.build_fetch(DOCUMENTS_BY_IDS, Some(&params))
    }

    /// Interpret a query response according to the configured `ResponseMode`.
    pub fn parse_fetch(&self, response: HttpResponse) -> Result<QueryOutput, QueryError> {
        if !response.is_success() {
            return Err(QueryError::Http {
                status: response.status,
                body: response.body,
            });
        }

        match self.config.response_mode {
            ResponseMode::Raw => Ok(QueryOutput::Raw(response.body)),
            ResponseMode::Envelope => unwrap_envelope(&response.body).map(QueryOutput::Result),
        }
    }

    /// Run `query` over a fresh `UreqTransport`.
    pub fn fetch(
        &self,
        query: &str,
        params: Option<&QueryParams>,
    ) -> Result<QueryOutput, QueryError> {
        self.fetch_with(&UreqTransport::new(), query, params)
    }

    pub fn fetch_with<T: Transport + ?Sized>(
        &self,
        transport: &T,
        query: &str,
        params: Option<&QueryParams>,
    ) -> Result<QueryOutput, QueryError> {
        let request = self.build_fetch(query, params)?;
        self.execute(transport, request)
    }

    /// The first document whose `_id` equals `document_id`, or `null`.
    pub fn get_document(&self, document_id: &str) -> Result<QueryOutput, QueryError> {
        self.get_document_with(&UreqTransport::new(), document_id)
    }

    pub fn get_document_with<T: Transport + ?Sized>(
        &self,
        transport: &T,
        document_id: &str,
    ) -> Result<QueryOutput, QueryError> {
        let request = self.build_get_document(document_id)?;
        self.execute(transport, request)
    }

    /// Every document whose `_id` is in `document_ids`.
    pub fn get_documents<S: AsRef<str>>(
        &self,
        document_ids: &[S],
    ) -> Result<QueryOutput, QueryError> {
        self.get_documents_with(&UreqTransport::new(), document_ids)
    }

    pub fn get_documents_with<T: Transport + ?Sized, S: AsRef<str>>(
        &self,
        transport: &T,
        document_ids: &[S],
    ) -> Result<QueryOutput, QueryError> {
        let request = self.build_get_documents(document_ids)?;
        self.execute(transport, request)
    }

    fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        request: HttpRequest,
    ) -> Result<QueryOutput, QueryError> {
        // The URL carries no credentials; the token only travels in a header.
        debug!(
            project = %self.config.project_id,
            dataset = %self.config.dataset,
            url = %request.url,
            "executing GROQ query"
        );
        let response = transport.execute(&request)?;
        debug!(status = response.status, "query response received");
        self.parse_fetch(response)
    }
}

/// Pull `result` out of `{"result": ...}`. A `null` result is valid.
fn unwrap_envelope(body: &str) -> Result<Value, QueryError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| QueryError::Parse(e.to_string()))?;
    let Value::Object(mut envelope) = value else {
        return Err(QueryError::Parse(
            "expected a JSON object envelope".to_string(),
        ));
    };
    envelope
        .remove("result")
        .ok_or_else(|| QueryError::Parse("response has no `result` field".to_string()))
}
