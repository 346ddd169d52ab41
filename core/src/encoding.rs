//! Query-string construction for the GROQ query endpoint.
//!
//! Values are form-encoded the way common URL libraries encode query values:
//! unreserved bytes (`A-Z a-z 0-9 - _ . ~`) pass through, space becomes `+`,
//! everything else becomes `%XX`. Parameter values are first rendered as GROQ
//! literals (JSON text), so a value containing `"` or `&` stays inside its
//! own parameter.

use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::types::QueryParams;

/// Percent-encode a single query-string component.
pub fn encode_component(raw: &str) -> String {
    // `urlencoding` emits `%20` for space; a literal `%20` in the input is
    // already `%2520` at this point, so the substitution is unambiguous.
    urlencoding::encode(raw).replace("%20", "+")
}

/// Render a parameter value as a GROQ literal.
///
/// Strings become `"..."` with JSON escaping, arrays become `[...]`, and so on.
pub fn groq_literal(value: &serde_json::Value) -> String {
    value.to_string()
}

/// Build `query=<enc>&$<name>=<enc literal>...` with parameters in ascending
/// name order.
pub fn encode_query_string(query: &str, params: Option<&QueryParams>) -> Result<String, QueryError> {
    let mut out = format!("query={}", encode_component(query));

    let Some(params) = params else {
        return Ok(out);
    };

    let mut normalized = BTreeMap::new();
    for (name, value) in params {
        let name = normalize_param_name(name)?;
        if normalized.insert(name, value).is_some() {
            return Err(QueryError::validation(format!(
                "parameter ${name} is given more than once"
            )));
        }
    }

    for (name, value) in normalized {
        out.push_str("&$");
        out.push_str(&encode_component(name));
        out.push('=');
        out.push_str(&encode_component(&groq_literal(value)));
    }
    Ok(out)
}

/// Strip an optional leading `$` and check the rest is a GROQ identifier.
fn normalize_param_name(name: &str) -> Result<&str, QueryError> {
    let bare = name.strip_prefix('$').unwrap_or(name);
    let mut chars = bare.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(QueryError::validation(format!(
            "invalid parameter name {name:?}"
        )));
    }
    Ok(bare)
}
