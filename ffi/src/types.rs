//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec`, and
//! enums with explicit discriminants. Conversions live here so `lib.rs` stays
//! focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use sanity_core::{HttpMethod, QueryError, QueryOutput, ResponseMode};

/// Opaque handle to a `QueryClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiQueryClient {
    pub(crate) inner: sanity_core::QueryClient,
}

/// Convert to a heap C string. Interior NUL bytes are dropped rather than
/// failing the whole call.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .unwrap_or_else(|e| {
            let mut bytes = e.into_vec();
            bytes.retain(|b| *b != 0);
            CString::new(bytes).unwrap_or_default()
        })
        .into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
        }
    }
}

/// How `sanity_parse_fetch` fills `FfiQueryResult::data`.
#[repr(C)]
#[derive(Clone, Copy)]
pub enum FfiResponseMode {
    /// The response body, verbatim.
    Raw = 0,
    /// The `result` member of the envelope, re-serialized as JSON.
    Envelope = 1,
}

impl From<FfiResponseMode> for ResponseMode {
    fn from(m: FfiResponseMode) -> Self {
        match m {
            FfiResponseMode::Raw => ResponseMode::Raw,
            FfiResponseMode::Envelope => ResponseMode::Envelope,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `sanity_build_*` functions. The C caller performs the GET and
/// passes the response back through `sanity_parse_fetch`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: sanity_core::HttpRequest) -> *mut Self {
        let url = into_c_string(req.url);

        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Vec<FfiHeader> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: into_c_string(k),
                    value: into_c_string(v),
                })
                .collect();
            // Boxed slice so capacity == len when reclaimed in `sanity_free_request`.
            Box::into_raw(ffi_headers.into_boxed_slice()) as *mut FfiHeader
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url,
            headers,
            headers_len,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing the request,
/// then passes a pointer to `sanity_parse_fetch`. The FFI layer reads but
/// does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiQueryResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    Validation = 1,
    Network = 2,
    Read = 3,
    Parse = 4,
    Http = 5,
    Panic = 6,
    NullArg = 7,
}

/// Result envelope for `sanity_parse_fetch`.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data` is a
/// JSON (or raw body) C string. On failure `error_code` describes the
/// category, `error_message` is human-readable, and `data` is null.
#[repr(C)]
pub struct FfiQueryResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data: *mut c_char,
}

impl FfiQueryResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: Option<String>,
        http_status: u16,
        data: Option<String>,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiQueryResult {
            error_code,
            error_message: error_message.map_or(std::ptr::null_mut(), into_c_string),
            http_status,
            data: data.map_or(std::ptr::null_mut(), into_c_string),
        }))
    }

    /// Build a success result from a parsed query.
    pub(crate) fn from_output(output: QueryOutput) -> *mut Self {
        let data = match output {
            QueryOutput::Raw(body) => body,
            QueryOutput::Result(value) => value.to_string(),
        };
        Self::boxed(FfiErrorCode::Ok, None, 0, Some(data))
    }

    /// Build an error result from a `QueryError`.
    pub(crate) fn from_error(err: QueryError) -> *mut Self {
        let (error_code, http_status) = match &err {
            QueryError::Validation(_) => (FfiErrorCode::Validation, 0),
            QueryError::Network(_) => (FfiErrorCode::Network, 0),
            QueryError::Read(_) => (FfiErrorCode::Read, 0),
            QueryError::Parse(_) => (FfiErrorCode::Parse, 0),
            QueryError::Http { status, .. } => (FfiErrorCode::Http, *status),
        };
        Self::boxed(error_code, Some(err.to_string()), http_status, None)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(
            FfiErrorCode::NullArg,
            Some(format!("null argument: {name}")),
            0,
            None,
        )
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, Some(msg.to_string()), 0, None)
    }
}
