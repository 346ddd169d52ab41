use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_sanity::{app, app_with, MockStore};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn store() -> MockStore {
    MockStore::new().with_documents(
        "prod",
        vec![
            json!({"_id": "doc1", "_type": "post", "title": "First"}),
            json!({"_id": "doc2", "_type": "post", "title": "Second"}),
            json!({"_id": "auth1", "_type": "author", "name": "Ada"}),
        ],
    )
}

// --- happy path ---

#[tokio::test]
async fn star_query_returns_all_documents() {
    let resp = app_with(store())
        .oneshot(get("/v2023-01-01/data/query/prod?query=%2A"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["query"], "*");
    assert_eq!(body["result"].as_array().unwrap().len(), 3);
    assert!(body["ms"].is_u64());
}

#[tokio::test]
async fn type_filter_with_plus_encoded_spaces() {
    let resp = app_with(store())
        .oneshot(get(
            "/v2023-01-01/data/query/prod?query=%2A%5B_type+%3D%3D+%22post%22%5D",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["query"], r#"*[_type == "post"]"#);
    assert_eq!(body["result"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn document_by_id_param() {
    let resp = app_with(store())
        .oneshot(get(
            "/v2023-01-01/data/query/prod?query=%2A%5B_id+%3D%3D+%24id%5D%5B0%5D&$id=%22doc2%22",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["result"]["title"], "Second");
}

#[tokio::test]
async fn missing_document_is_null_result() {
    let resp = app_with(store())
        .oneshot(get(
            "/v2023-01-01/data/query/prod?query=%2A%5B_id+%3D%3D+%24id%5D%5B0%5D&$id=%22nope%22",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body.as_object().unwrap().contains_key("result"));
    assert!(body["result"].is_null());
}

#[tokio::test]
async fn documents_by_id_list() {
    let resp = app_with(store())
        .oneshot(get(
            "/v2023-01-01/data/query/prod?query=%2A%5B_id+in+%24ids%5D&$ids=%5B%22doc1%22%2C%22auth1%22%5D",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let ids: Vec<&str> = body["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["doc1", "auth1"]);
}

// --- errors ---

#[tokio::test]
async fn empty_store_dataset_not_found() {
    let resp = app()
        .oneshot(get("/v2023-01-01/data/query/prod?query=%2A"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "notFoundError");
}

#[tokio::test]
async fn missing_query_returns_400() {
    let resp = app_with(store())
        .oneshot(get("/v2023-01-01/data/query/prod"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "queryParseError");
}

#[tokio::test]
async fn undated_api_version_returns_400() {
    let resp = app_with(store())
        .oneshot(get("/2023-01-01/data/query/prod?query=%2A"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "apiVersionError");
}

#[tokio::test]
async fn unreferenced_param_value_must_be_json() {
    let resp = app_with(store())
        .oneshot(get("/v2023-01-01/data/query/prod?query=%2A&$id=doc1"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_query_returns_400() {
    let resp = app_with(store())
        .oneshot(get("/v2023-01-01/data/query/prod?query=count%28%2A%29"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());
}

#[tokio::test]
async fn wrong_method_returns_405() {
    let resp = app_with(store())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v2023-01-01/data/query/prod?query=%2A")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- auth ---

#[tokio::test]
async fn token_required_when_configured() {
    let app = app_with(store().with_token("secret"));

    let resp = app
        .clone()
        .oneshot(get("/v2023-01-01/data/query/prod?query=%2A"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v2023-01-01/data/query/prod?query=%2A")
                .header(http::header::AUTHORIZATION, "Bearer wrong")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/v2023-01-01/data/query/prod?query=%2A")
                .header(http::header::AUTHORIZATION, "Bearer secret")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
