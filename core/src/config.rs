//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data so a host can fill it in from code or load it
//! from any serde format. It is only trusted after `QueryClient::from_config`
//! has validated and normalized it; the client then keeps its own private
//! copy and never hands out a mutable reference.

use std::fmt;

use serde::Deserialize;

use crate::error::QueryError;
use crate::types::ResponseMode;

/// Connection settings for one project/dataset pair.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub project_id: String,
    pub dataset: String,
    /// Bearer token. Absent or empty means unauthenticated requests.
    pub token: Option<String>,
    /// Dated API version such as `v2023-01-01`. Absent or empty means today.
    pub api_version: Option<String>,
    /// Base URL override, e.g. a proxy or a local mock. Defaults to
    /// `https://{project_id}.api.sanity.io`.
    pub api_host: Option<String>,
    pub response_mode: ResponseMode,
}

impl ClientConfig {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Check required fields and fill in defaults. Called once per client.
    pub(crate) fn normalize(mut self) -> Result<Self, QueryError> {
        if self.project_id.is_empty() {
            return Err(QueryError::validation("projectID is required"));
        }
        if self.dataset.is_empty() {
            return Err(QueryError::validation("dataset is required"));
        }
        // These land in the host name and path unescaped.
        let ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        check_chars("projectID", &self.project_id, ident)?;
        check_chars("dataset", &self.dataset, ident)?;
        if let Some(api_version) = &self.api_version {
            check_chars("apiVersion", api_version, |c| {
                c.is_ascii_alphanumeric() || c == '.' || c == '-'
            })?;
        }

        self.token = self.token.filter(|t| !t.is_empty());
        self.api_host = self
            .api_host
            .map(|h| h.trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty());
        if self.api_version.as_deref().map_or(true, str::is_empty) {
            self.api_version = Some(default_api_version());
        }
        Ok(self)
    }

    /// Apply the overrides in `update` to a copy of `self`.
    pub(crate) fn merged(&self, update: ConfigUpdate) -> Self {
        let mut next = self.clone();
        if let Some(project_id) = update.project_id {
            next.project_id = project_id;
        }
        if let Some(dataset) = update.dataset {
            next.dataset = dataset;
        }
        if let Some(token) = update.token {
            next.token = Some(token);
        }
        if let Some(api_version) = update.api_version {
            next.api_version = Some(api_version);
        }
        next
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("api_host", &self.api_host)
            .field("response_mode", &self.response_mode)
            .finish()
    }
}

/// Field overrides for `QueryClient::update`. `None` keeps the current value.
///
/// An empty `token` clears authentication; an empty `api_version` falls back
/// to today's date.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub token: Option<String>,
    pub api_version: Option<String>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

fn check_chars(
    field: &str,
    value: &str,
    allowed: impl Fn(char) -> bool,
) -> Result<(), QueryError> {
    match value.chars().find(|c| !allowed(*c)) {
        Some(c) => Err(QueryError::validation(format!(
            "{field} contains invalid character {c:?}"
        ))),
        None => Ok(()),
    }
}

/// `v` followed by today's local date, e.g. `v2024-05-17`.
pub fn default_api_version() -> String {
    chrono::Local::now().format("v%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_api_version_is_date_shaped() {
        let v = default_api_version();
        assert!(v.starts_with('v'));
        assert!(chrono::NaiveDate::parse_from_str(&v[1..], "%Y-%m-%d").is_ok());
    }

    #[test]
    fn normalize_fills_defaults() {
        let cfg = ClientConfig {
            token: Some(String::new()),
            api_host: Some("http://127.0.0.1:3333/".to_string()),
            ..ClientConfig::new("abc", "prod")
        }
        .normalize()
        .unwrap();
        assert!(cfg.token.is_none());
        assert_eq!(cfg.api_host.as_deref(), Some("http://127.0.0.1:3333"));
        assert!(cfg.api_version.as_deref().unwrap().starts_with('v'));
    }

    #[test]
    fn normalize_rejects_missing_ids() {
        assert!(matches!(
            ClientConfig::new("", "prod").normalize(),
            Err(QueryError::Validation(_))
        ));
        assert!(matches!(
            ClientConfig::new("abc", "").normalize(),
            Err(QueryError::Validation(_))
        ));
    }

    #[test]
    fn normalize_rejects_url_metacharacters() {
        for (project, dataset) in [
            ("attacker.example/#", "prod"),
            ("abc.evil", "prod"),
            ("abc@host", "prod"),
            ("abc", "prod/../x"),
            ("abc", "prod?query=*"),
            ("abc", "prod dev"),
        ] {
            let err = ClientConfig::new(project, dataset).normalize().unwrap_err();
            assert!(matches!(err, QueryError::Validation(_)), "{project}/{dataset}");
        }

        for version in ["v2023-01-01/../x", "v1?x=1", "v1#"] {
            let cfg = ClientConfig {
                api_version: Some(version.to_string()),
                ..ClientConfig::new("abc", "prod")
            };
            assert!(matches!(cfg.normalize(), Err(QueryError::Validation(_))), "{version}");
        }
    }

    #[test]
    fn normalize_accepts_identifier_shaped_ids() {
        let cfg = ClientConfig {
            api_version: Some("v2021-10-21".to_string()),
            ..ClientConfig::new("my-project_1", "staging-2")
        };
        assert!(cfg.normalize().is_ok());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = ClientConfig {
            token: Some("sk-secret".to_string()),
            ..ClientConfig::new("abc", "prod")
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn deserialize_from_json_with_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"project_id":"abc","dataset":"prod","response_mode":"raw"}"#)
                .unwrap();
        assert_eq!(cfg.project_id, "abc");
        assert_eq!(cfg.response_mode, ResponseMode::Raw);
        assert!(cfg.token.is_none());
    }
}
