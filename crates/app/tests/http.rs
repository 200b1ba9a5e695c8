//! Drives the console router end to end against an in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use futures::StreamExt;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bucketeer::http_server;
use bucketeer::{FileConfig, ServiceConfig, ServiceState, StoreKind};
use common::prelude::{CancellationToken, Console, ObjectMetadata, Store};
use object_store::NamespacedStore;

async fn put(console: &Console, bucket: &str, prefix: &str, name: &str, data: &'static str) {
    let size = data.len() as u64;
    let body = futures::stream::once(async move { Ok(Bytes::from_static(data.as_bytes())) }).boxed();
    console
        .put_object(bucket, prefix, name, body, size, ObjectMetadata::default())
        .await
        .unwrap();
}

/// Router over a `docs` bucket holding `a/b.txt`, `a/c/d.txt` and `e.txt`.
async fn app() -> (Router, ServiceState) {
    let config = ServiceConfig::try_from(FileConfig {
        store: Some(StoreKind::Memory),
        ..Default::default()
    })
    .unwrap();
    let store: Arc<dyn Store> = Arc::new(NamespacedStore::memory());
    let state = ServiceState::from_store(store, &config);

    let console = state.console();
    console.create_bucket("docs").await.unwrap();
    put(console, "docs", "a", "b.txt", "b").await;
    put(console, "docs", "a/c", "d.txt", "dd").await;
    put(console, "docs", "/", "e.txt", "eee").await;

    let http_config = http_server::Config::new("127.0.0.1:0", config.request_timeout);
    (http_server::router(http_config, state.clone()), state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Bytes) {
    let response = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_form(app: &Router, uri: &str, form: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_api_lists_buckets() {
    let (app, _) = app().await;
    let (status, json) = get_json(&app, "/api/v0/buckets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["buckets"][0]["name"], "docs");
}

#[tokio::test]
async fn test_api_listing_at_root() {
    let (app, _) = app().await;
    let (status, json) = get_json(&app, "/api/v0/objects?bucket=docs").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["query_prefix"], "/");
    assert_eq!(json["common_prefixes"], serde_json::json!([{"prefix": "a/"}]));
    let objects = json["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["key"], "e.txt");
    assert_eq!(objects[0]["size"], 3);
    assert_eq!(json["breadcrumbs"], serde_json::json!([]));
    assert_eq!(json["truncated"], false);
}

#[tokio::test]
async fn test_api_listing_below_prefix() {
    let (app, _) = app().await;
    let (status, json) = get_json(&app, "/api/v0/objects?bucket=docs&prefix=a/").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        json["common_prefixes"],
        serde_json::json!([{"prefix": "a/c/"}])
    );
    assert_eq!(json["objects"][0]["key"], "a/b.txt");
    assert_eq!(
        json["breadcrumbs"],
        serde_json::json!([{"display_name": "a/", "cumulative_prefix": "a"}])
    );
}

#[tokio::test]
async fn test_api_listing_requires_bucket() {
    let (app, _) = app().await;
    let (status, json) = get_json(&app, "/api/v0/objects?prefix=a/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["msg"].as_str().unwrap().contains("bucket"));
}

#[tokio::test]
async fn test_listing_page() {
    let (app, _) = app().await;
    let (status, body) = get(&app, "/objects?bucket=docs&prefix=%2Fa%2F").await;
    assert_eq!(status, StatusCode::OK);

    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("b.txt"));
    assert!(page.contains("c/"));
    assert!(!page.contains("e.txt"));
}

#[tokio::test]
async fn test_bucket_page_lists_buckets() {
    let (app, _) = app().await;
    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body.to_vec()).unwrap().contains("docs"));
}

#[tokio::test]
async fn test_object_page() {
    let (app, _) = app().await;
    let (status, body) = get(&app, "/object?bucket=docs&objectID=a%2Fc%2Fd.txt").await;
    assert_eq!(status, StatusCode::OK);

    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("a/c/d.txt"));
    assert!(page.contains("/a/c"));
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let (app, _) = app().await;
    let (status, _) = get(&app, "/object?bucket=docs&objectID=missing.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_raw_streams_content() {
    let (app, _) = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::get("/object/raw?bucket=docs&objectID=a%2Fc%2Fd.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "2");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"dd");
}

#[tokio::test]
async fn test_create_bucket_redirects_to_listing() {
    let (app, state) = app().await;
    let response = post_form(&app, "/buckets", "bucket=photos").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/objects?bucket=photos&prefix=%2F");

    let buckets = state.console().list_buckets().await.unwrap();
    assert!(buckets.iter().any(|b| b.name == "photos"));
}

#[tokio::test]
async fn test_create_bucket_requires_name() {
    let (app, _) = app().await;
    let response = post_form(&app, "/buckets", "bucket=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_object_redirects_to_parent() {
    let (app, state) = app().await;
    let response = post_form(&app, "/object/trash", "bucket=docs&objectID=a%2Fb.txt").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/objects?bucket=docs&prefix=%2Fa%2F");

    let err = state
        .console()
        .stat_object("docs", "a/b.txt")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_missing_object_succeeds() {
    let (app, _) = app().await;
    let response = post_form(&app, "/object/trash", "bucket=docs&objectID=nope.txt").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/objects?bucket=docs&prefix=%2F");
}

fn upload_form(prefix: &str, file_name: &str, content: &str) -> String {
    format!(
        concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"bucket\"\r\n\r\n",
            "docs\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"prefix\"\r\n\r\n",
            "{}\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"content\"; filename=\"{}\"\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "{}\r\n",
            "--XBOUNDARY--\r\n",
        ),
        prefix, file_name, content
    )
}

async fn post_upload(app: &Router, body: String) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post("/objects")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=XBOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_stores_file_under_prefix() {
    let (app, state) = app().await;

    let response = post_upload(&app, upload_form("/notes/", "hello.txt", "hello world")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/objects?bucket=docs&prefix=%2Fnotes%2F");

    let info = state
        .console()
        .stat_object("docs", "notes/hello.txt")
        .await
        .unwrap();
    assert_eq!(info.size, 11);
    assert_eq!(info.content_type, "text/plain");
}

#[tokio::test]
async fn test_uploaded_key_opens_from_listing() {
    let (app, _) = app().await;

    let response = post_upload(&app, upload_form("/", "100%.txt", "full")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let (_, json) = get_json(&app, "/api/v0/objects?bucket=docs").await;
    assert_eq!(json["objects"][0]["key"], "100%.txt");

    let (status, body) = get(&app, "/object/raw?bucket=docs&objectID=100%25.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"full");
}

#[tokio::test]
async fn test_upload_under_unstorable_key_is_rejected() {
    let (app, state) = app().await;

    let response = post_upload(&app, upload_form("/a//", "b.txt", "b")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listing = state
        .console()
        .list_objects("docs", "/a/", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(listing.objects.len(), 1);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let (app, _) = app().await;

    let body = concat!(
        "--XBOUNDARY\r\n",
        "Content-Disposition: form-data; name=\"bucket\"\r\n\r\n",
        "docs\r\n",
        "--XBOUNDARY--\r\n",
    );
    let response = app
        .clone()
        .oneshot(
            Request::post("/objects")
                .header(
                    header::CONTENT_TYPE,
                    "multipart/form-data; boundary=XBOUNDARY",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_routes() {
    let (app, _) = app().await;

    let (status, json) = get_json(&app, "/_status/livez").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (status, json) = get_json(&app, "/_status/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");

    let (status, json) = get_json(&app, "/_status/version").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_static_assets_are_embedded() {
    let (app, _) = app().await;
    let response = app
        .clone()
        .oneshot(Request::get("/static/style.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
}

#[tokio::test]
async fn test_unknown_route_negotiates_not_found() {
    let (app, _) = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::get("/nowhere")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
}
