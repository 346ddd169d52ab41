//! Value types shared by the client, the transport, and the FFI layer.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Named GROQ parameters. Keys may be written with or without the leading
/// `$`; values are sent as GROQ literals (`"text"`, `42`, `["a","b"]`).
pub type QueryParams = BTreeMap<String, serde_json::Value>;

/// How `parse_fetch` treats a successful response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Hand back the body untouched.
    Raw,
    /// Decode `{"result": ...}` and return only `result`.
    #[default]
    Envelope,
}

/// The outcome of a successful query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Raw(String),
    Result(serde_json::Value),
}

impl QueryOutput {
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            QueryOutput::Raw(body) => Some(body),
            QueryOutput::Result(_) => None,
        }
    }

    /// The JSON value: the unwrapped `result` in envelope mode, or the raw
    /// body parsed as a whole in raw mode.
    pub fn into_value(self) -> Result<serde_json::Value, QueryError> {
        match self {
            QueryOutput::Result(value) => Ok(value),
            QueryOutput::Raw(body) => {
                serde_json::from_str(&body).map_err(|e| QueryError::Parse(e.to_string()))
            }
        }
    }

    /// Decode into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, QueryError> {
        match self {
            QueryOutput::Result(value) => {
                serde_json::from_value(value).map_err(|e| QueryError::Parse(e.to_string()))
            }
            QueryOutput::Raw(body) => {
                serde_json::from_str(&body).map_err(|e| QueryError::Parse(e.to_string()))
            }
        }
    }
}
