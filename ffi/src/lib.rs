//! C-ABI wrapper around `sanity-core`.
//!
//! # Overview
//! Exposes GROQ query building and response parsing through `extern "C"`
//! functions so any language with a C FFI can query a dataset using its own
//! HTTP stack, without linking to ureq or serde directly.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `sanity_build_*` / `sanity_parse_fetch` mirror the core's build/parse
//!   split 1:1.
//! - Client handles are immutable: `clone`, `update`, and the `with_*`
//!   functions hand back a new handle and leave the argument as it was.
//! - The C caller owns all returned pointers and must call the matching
//!   `sanity_*_free` / `sanity_free_*` function to release them.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;

use sanity_core::{ConfigUpdate, HttpResponse, QueryClient, QueryError, QueryParams};
use serde_json::Value;

use types::*;

// ---------------------------------------------------------------------------
// Pointer helpers
// ---------------------------------------------------------------------------

/// Borrow a C string. `None` for null or invalid UTF-8.
unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

/// Borrow `len` C strings. An empty list may be passed as null.
unsafe fn c_str_array<'a>(ptr: *const *const c_char, len: u32) -> Option<Vec<&'a str>> {
    if len == 0 {
        return Some(Vec::new());
    }
    if ptr.is_null() {
        return None;
    }
    std::slice::from_raw_parts(ptr, len as usize)
        .iter()
        .map(|p| c_str(*p))
        .collect()
}

fn into_handle(client: QueryClient) -> *mut FfiQueryClient {
    Box::into_raw(Box::new(FfiQueryClient { inner: client }))
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for `project_id` / `dataset`.
///
/// `token` and `api_version` may be null or empty: no authentication, and
/// today's dated API version respectively. Returns null if a required
/// argument is null or empty. Free with `sanity_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_new(
    project_id: *const c_char,
    dataset: *const c_char,
    token: *const c_char,
    api_version: *const c_char,
) -> *mut FfiQueryClient {
    catch_unwind(|| {
        let (Some(project_id), Some(dataset)) = (unsafe { c_str(project_id) }, unsafe { c_str(dataset) })
        else {
            return std::ptr::null_mut();
        };
        let token = unsafe { c_str(token) }.unwrap_or("");
        let api_version = unsafe { c_str(api_version) }.unwrap_or("");
        match QueryClient::new(project_id, dataset, token, api_version) {
            Ok(client) => into_handle(client),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client handle. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_free(client: *mut FfiQueryClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Independent copy of `client`. Returns null if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_clone(client: *const FfiQueryClient) -> *mut FfiQueryClient {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        into_handle(client.inner.clone())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// New handle with the non-null fields replaced; `client` is unchanged.
///
/// Returns null if `client` is null or the result fails validation (for
/// example an empty `dataset`).
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_update(
    client: *const FfiQueryClient,
    project_id: *const c_char,
    dataset: *const c_char,
    token: *const c_char,
    api_version: *const c_char,
) -> *mut FfiQueryClient {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let update = ConfigUpdate {
            project_id: unsafe { c_str(project_id) }.map(str::to_string),
            dataset: unsafe { c_str(dataset) }.map(str::to_string),
            token: unsafe { c_str(token) }.map(str::to_string),
            api_version: unsafe { c_str(api_version) }.map(str::to_string),
        };
        match client.inner.update(update) {
            Ok(updated) => into_handle(updated),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// New handle whose requests go to `api_host` (e.g. `http://127.0.0.1:3333`)
/// instead of the project's hosted API.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_with_api_host(
    client: *const FfiQueryClient,
    api_host: *const c_char,
) -> *mut FfiQueryClient {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(api_host) = (unsafe { c_str(api_host) }) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        into_handle(client.inner.clone().with_api_host(api_host))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// New handle using `mode` for `sanity_parse_fetch`.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_client_with_response_mode(
    client: *const FfiQueryClient,
    mode: FfiResponseMode,
) -> *mut FfiQueryClient {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        into_handle(client.inner.clone().with_response_mode(mode.into()))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the GET request for `query`.
///
/// `param_names` / `param_values` are parallel arrays of `params_len` C
/// strings; each value is bound as a GROQ string. Names may carry a leading
/// `$`. Returns null on null arguments or validation failure (empty query,
/// bad parameter name). Free with `sanity_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_build_fetch(
    client: *const FfiQueryClient,
    query: *const c_char,
    param_names: *const *const c_char,
    param_values: *const *const c_char,
    params_len: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(query) = (unsafe { c_str(query) }) else {
            return std::ptr::null_mut();
        };
        let (Some(names), Some(values)) = (
            unsafe { c_str_array(param_names, params_len) },
            unsafe { c_str_array(param_values, params_len) },
        ) else {
            return std::ptr::null_mut();
        };

        let params: QueryParams = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        let params = (!params.is_empty()).then_some(&params);

        match client.inner.build_fetch(query, params) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request for the first document with `_id == document_id`.
///
/// Returns null if `client` or `document_id` is null or empty.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_build_get_document(
    client: *const FfiQueryClient,
    document_id: *const c_char,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(document_id) = (unsafe { c_str(document_id) }) else {
            return std::ptr::null_mut();
        };
        match client.inner.build_get_document(document_id) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request for every document whose `_id` is in `document_ids`.
///
/// Returns null if `client` is null, or `document_ids` is null with a
/// non-zero `ids_len`.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_build_get_documents(
    client: *const FfiQueryClient,
    document_ids: *const *const c_char,
    ids_len: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let Some(ids) = (unsafe { c_str_array(document_ids, ids_len) }) else {
            return std::ptr::null_mut();
        };
        match client.inner.build_get_documents(ids.as_slice()) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response function
// ---------------------------------------------------------------------------

/// A null body reads as empty; a body that is not UTF-8 is a `Read` error.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> Result<HttpResponse, QueryError> {
    if resp.body.is_null() {
        return Ok(HttpResponse::new(resp.status, ""));
    }
    let body = unsafe { CStr::from_ptr(resp.body) }
        .to_str()
        .map_err(|e| QueryError::Read(format!("response body is not valid UTF-8: {e}")))?;
    Ok(HttpResponse::new(resp.status, body))
}

/// Parse the response to any `sanity_build_*` request.
///
/// On success `data` holds the raw body or the `result` JSON, depending on
/// the client's response mode. Free with `sanity_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_parse_fetch(
    client: *const FfiQueryClient,
    response: *const FfiHttpResponse,
) -> *mut FfiQueryResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiQueryResult::null_arg("client");
        }
        if response.is_null() {
            return FfiQueryResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        match ffi_response_to_core(resp).and_then(|r| client.inner.parse_fetch(r)) {
            Ok(output) => FfiQueryResult::from_output(output),
            Err(e) => FfiQueryResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiQueryResult::panic("panic in sanity_parse_fetch"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `sanity_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        if !req.url.is_null() {
            drop(unsafe { CString::from_raw(req.url) });
        }
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    req.headers,
                    req.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                if !h.key.is_null() {
                    drop(unsafe { CString::from_raw(h.key) });
                }
                if !h.value.is_null() {
                    drop(unsafe { CString::from_raw(h.value) });
                }
            }
        }
    });
}

/// Free an `FfiQueryResult` returned by `sanity_parse_fetch`. Safe to call
/// with null.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_free_result(result: *mut FfiQueryResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.data.is_null() {
            drop(unsafe { CString::from_raw(result.data) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sanity_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
