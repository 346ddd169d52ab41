//! Drive the C ABI end-to-end against the live mock server.
//!
//! Plays the part of a C host: builds requests through `sanity_build_*`,
//! executes them with ureq, and hands the status and body back through
//! `sanity_parse_fetch`.

use std::ffi::{CStr, CString};

use mock_sanity::MockStore;
use sanity_ffi::types::{FfiErrorCode, FfiHttpRequest, FfiHttpResponse, FfiQueryClient};
use sanity_ffi::*;
use serde_json::json;

fn start_server(store: MockStore) -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_sanity::run(listener, store).await
        })
        .unwrap();
    });

    addr
}

/// Execute an `FfiHttpRequest` the way a C host would and return the
/// parsed result's (error code, data) pair.
fn execute(client: *const FfiQueryClient, req: *mut FfiHttpRequest) -> (FfiErrorCode, Option<String>) {
    assert!(!req.is_null());
    let req_ref = unsafe { &*req };
    let url = unsafe { CStr::from_ptr(req_ref.url) }.to_str().unwrap().to_string();
    let headers = if req_ref.headers_len == 0 {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(req_ref.headers, req_ref.headers_len as usize) }
    };

    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let mut builder = agent.get(&url);
    for h in headers {
        let k = unsafe { CStr::from_ptr(h.key) }.to_str().unwrap();
        let v = unsafe { CStr::from_ptr(h.value) }.to_str().unwrap();
        builder = builder.header(k, v);
    }
    let mut response = builder.call().expect("HTTP transport error");
    let status = response.status().as_u16();
    let body = CString::new(response.body_mut().read_to_string().unwrap_or_default()).unwrap();
    sanity_free_request(req);

    let ffi_resp = FfiHttpResponse {
        status,
        body: body.as_ptr(),
    };
    let result = sanity_parse_fetch(client, &ffi_resp);
    let r = unsafe { &*result };
    let code = r.error_code;
    let data = (!r.data.is_null())
        .then(|| unsafe { CStr::from_ptr(r.data) }.to_str().unwrap().to_string());
    sanity_free_result(result);
    (code, data)
}

#[test]
fn query_through_c_abi() {
    let addr = start_server(
        MockStore::new()
            .with_token("xyz")
            .with_documents(
                "prod",
                vec![
                    json!({"_id": "doc1", "_type": "post", "title": "First"}),
                    json!({"_id": "doc2", "_type": "post", "title": "Second"}),
                ],
            ),
    );

    let project = CString::new("abc").unwrap();
    let dataset = CString::new("prod").unwrap();
    let token = CString::new("xyz").unwrap();
    let version = CString::new("v2023-01-01").unwrap();
    let remote = sanity_client_new(project.as_ptr(), dataset.as_ptr(), token.as_ptr(), version.as_ptr());
    let host = CString::new(format!("http://{addr}")).unwrap();
    let client = sanity_client_with_api_host(remote, host.as_ptr());
    sanity_client_free(remote);

    // Single document.
    let id = CString::new("doc2").unwrap();
    let (code, data) = execute(client, sanity_build_get_document(client, id.as_ptr()));
    assert_eq!(code, FfiErrorCode::Ok);
    let doc: serde_json::Value = serde_json::from_str(&data.unwrap()).unwrap();
    assert_eq!(doc["title"], "Second");

    // Parameterized filter.
    let query = CString::new("*[_type == $type]").unwrap();
    let name = CString::new("$type").unwrap();
    let value = CString::new("post").unwrap();
    let names = [name.as_ptr()];
    let values = [value.as_ptr()];
    let req = sanity_build_fetch(client, query.as_ptr(), names.as_ptr(), values.as_ptr(), 1);
    let (code, data) = execute(client, req);
    assert_eq!(code, FfiErrorCode::Ok);
    let posts: serde_json::Value = serde_json::from_str(&data.unwrap()).unwrap();
    assert_eq!(posts.as_array().unwrap().len(), 2);

    // Dropping the token gets a 401 from the server.
    let empty = CString::new("").unwrap();
    let anonymous = sanity_client_update(
        client,
        std::ptr::null(),
        std::ptr::null(),
        empty.as_ptr(),
        std::ptr::null(),
    );
    let (code, data) = execute(anonymous, sanity_build_get_document(anonymous, id.as_ptr()));
    assert_eq!(code, FfiErrorCode::Http);
    assert!(data.is_none());

    sanity_client_free(anonymous);
    sanity_client_free(client);
}
