//! In-memory stand-in for the Sanity query endpoint.
//!
//! Serves `GET /{api_version}/data/query/{dataset}` over a fixed set of
//! documents. Only the filter shapes the client itself emits are understood:
//! `*`, `*[field == operand]`, `*[field in operand]`, each optionally followed
//! by `[index]`. Operands are `$param` references or JSON literals.

use std::{collections::HashMap, sync::Arc, time::Instant};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Documents per dataset, plus the token every request must present (if set).
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    datasets: HashMap<String, Vec<Value>>,
    token: Option<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_documents(mut self, dataset: impl Into<String>, documents: Vec<Value>) -> Self {
        self.datasets.entry(dataset.into()).or_default().extend(documents);
        self
    }

    /// Load `{"<dataset>": [documents...], ...}`.
    pub fn from_seed(seed: &str) -> Result<Self, serde_json::Error> {
        let datasets: HashMap<String, Vec<Value>> = serde_json::from_str(seed)?;
        Ok(Self {
            datasets,
            token: None,
        })
    }
}

/// Read-only after construction, so shared without a lock.
pub type Db = Arc<MockStore>;

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub ms: u64,
    pub query: String,
    pub result: Value,
}

/// Error reply in the `{"error": {"description", "type"}}` shape.
#[derive(Debug)]
pub struct QueryFailure {
    status: StatusCode,
    kind: &'static str,
    description: String,
}

impl QueryFailure {
    fn new(status: StatusCode, kind: &'static str, description: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            description: description.into(),
        }
    }

    fn bad_query(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "queryParseError", description)
    }
}

impl IntoResponse for QueryFailure {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "description": self.description,
                "type": self.kind,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with(MockStore::new())
}

pub fn app_with(store: MockStore) -> Router {
    let db: Db = Arc::new(store);
    Router::new()
        .route("/{api_version}/data/query/{dataset}", get(run_query))
        .with_state(db)
}

pub async fn run(listener: TcpListener, store: MockStore) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(store)).await
}

async fn run_query(
    State(db): State<Db>,
    Path((api_version, dataset)): Path<(String, String)>,
    Query(raw_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<QueryResponse>, QueryFailure> {
    let started = Instant::now();

    if !is_valid_api_version(&api_version) {
        return Err(QueryFailure::new(
            StatusCode::BAD_REQUEST,
            "apiVersionError",
            format!("invalid API version {api_version:?}"),
        ));
    }

    let store = db.as_ref();
    if let Some(expected) = &store.token {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            tracing::debug!(dataset = %dataset, "rejecting request with missing or wrong token");
            return Err(QueryFailure::new(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "session not found",
            ));
        }
    }

    let query = raw_params
        .get("query")
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| QueryFailure::bad_query("missing query parameter"))?
        .to_string();

    let documents = store.datasets.get(&dataset).ok_or_else(|| {
        QueryFailure::new(
            StatusCode::NOT_FOUND,
            "notFoundError",
            format!("dataset {dataset:?} not found"),
        )
    })?;

    let params = decode_params(&raw_params)?;
    let result = evaluate(&query, &params, documents)?;
    tracing::debug!(dataset = %dataset, query = %query, "query served");

    Ok(Json(QueryResponse {
        ms: started.elapsed().as_millis() as u64,
        query,
        result,
    }))
}

/// `X`, `1`, or `vYYYY-MM-DD`.
fn is_valid_api_version(version: &str) -> bool {
    if version == "X" || version == "1" {
        return true;
    }
    let Some(date) = version.strip_prefix('v') else {
        return false;
    };
    let bytes = date.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Collect `$name` query parameters, each a JSON literal.
fn decode_params(raw: &HashMap<String, String>) -> Result<HashMap<String, Value>, QueryFailure> {
    raw.iter()
        .filter_map(|(k, v)| k.strip_prefix('$').map(|name| (name, v)))
        .map(|(name, v)| {
            serde_json::from_str(v)
                .map(|value| (name.to_string(), value))
                .map_err(|e| QueryFailure::bad_query(format!("invalid value for ${name}: {e}")))
        })
        .collect()
}

enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

/// Evaluate the supported GROQ subset against `documents`.
pub fn evaluate(
    query: &str,
    params: &HashMap<String, Value>,
    documents: &[Value],
) -> Result<Value, QueryFailure> {
    let rest = query
        .trim()
        .strip_prefix('*')
        .ok_or_else(|| QueryFailure::bad_query("query must start with '*'"))?;

    let mut groups = bracket_groups(rest)?;
    let has_index = groups
        .last()
        .is_some_and(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()));
    let index = if has_index {
        let last = groups.pop().unwrap_or_default();
        let parsed: usize = last
            .parse()
            .map_err(|_| QueryFailure::bad_query("index out of range"))?;
        Some(parsed)
    } else {
        None
    };
    if groups.len() > 1 {
        return Err(QueryFailure::bad_query("only one filter is supported"));
    }

    let filter = groups
        .first()
        .map(|group| parse_filter(group, params))
        .transpose()?;

    let matched: Vec<Value> = documents
        .iter()
        .filter(|doc| match &filter {
            None => true,
            Some(Filter::Eq(field, expected)) => lookup(doc, field) == Some(expected),
            Some(Filter::In(field, allowed)) => {
                lookup(doc, field).is_some_and(|v| allowed.contains(v))
            }
        })
        .cloned()
        .collect();

    Ok(match index {
        Some(i) => matched.into_iter().nth(i).unwrap_or(Value::Null),
        None => Value::Array(matched),
    })
}

/// Split `[a][b]...` into its bracket contents, respecting nested brackets
/// and string literals.
fn bracket_groups(input: &str) -> Result<Vec<String>, QueryFailure> {
    let mut groups = Vec::new();
    let mut chars = input.trim().chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c != '[' {
            return Err(QueryFailure::bad_query(format!("unexpected {c:?}")));
        }

        let mut depth = 1;
        let mut in_string = false;
        let mut escaped = false;
        let mut group = String::new();
        loop {
            let Some(c) = chars.next() else {
                return Err(QueryFailure::bad_query("unterminated '['"));
            };
            if in_string {
                match (escaped, c) {
                    (true, _) => escaped = false,
                    (false, '\\') => escaped = true,
                    (false, '"') => in_string = false,
                    _ => {}
                }
            } else {
                match c {
                    '"' => in_string = true,
                    '[' => depth += 1,
                    ']' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            group.push(c);
        }
        groups.push(group.trim().to_string());
    }
    Ok(groups)
}

fn parse_filter(group: &str, params: &HashMap<String, Value>) -> Result<Filter, QueryFailure> {
    if let Some((field, operand)) = split_outside_strings(group, "==") {
        let field = parse_field(field)?;
        return Ok(Filter::Eq(field, resolve_operand(operand, params)?));
    }
    if let Some((field, operand)) = split_outside_strings(group, " in ") {
        let field = parse_field(field)?;
        return match resolve_operand(operand, params)? {
            Value::Array(items) => Ok(Filter::In(field, items)),
            _ => Err(QueryFailure::bad_query("'in' expects an array")),
        };
    }
    Err(QueryFailure::bad_query(format!("unsupported filter {group:?}")))
}

/// `str::split_once`, skipping matches inside `"..."` literals.
fn split_outside_strings<'a>(input: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
        } else if c == '"' {
            in_string = true;
        } else if input[i..].starts_with(op) {
            return Some((&input[..i], &input[i + op.len()..]));
        }
    }
    None
}

fn parse_field(raw: &str) -> Result<String, QueryFailure> {
    let field = raw.trim();
    let valid = !field.is_empty()
        && field
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if valid {
        Ok(field.to_string())
    } else {
        Err(QueryFailure::bad_query(format!("invalid attribute {field:?}")))
    }
}

fn resolve_operand(raw: &str, params: &HashMap<String, Value>) -> Result<Value, QueryFailure> {
    let operand = raw.trim();
    if let Some(name) = operand.strip_prefix('$') {
        return params.get(name).cloned().ok_or_else(|| {
            QueryFailure::bad_query(format!("param ${name} referenced, but not provided"))
        });
    }
    serde_json::from_str(operand)
        .map_err(|_| QueryFailure::bad_query(format!("unsupported operand {operand:?}")))
}

/// Follow a dotted attribute path.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, key| value.get(key))
}
