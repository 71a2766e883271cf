//! Combo routes end to end over the axum router

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jet_engine::server::{router, ComboService};
use jet_engine::build_all;
use tower::ServiceExt;

use crate::common::{sample_repo, TestRepo};

struct Response {
    status: StatusCode,
    content_type: Option<String>,
    cors: Option<String>,
    body: String,
}

fn app(repo: &TestRepo, use_hash: bool) -> Router {
    let ctx = repo.context(&["app", "lib"], use_hash);
    build_all(ctx.pipeline(), ctx.store()).unwrap();
    router(Arc::new(ComboService::new(ctx)))
}

async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header(header::ORIGIN, "http://page.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let headers = response.headers();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let cors = headers
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string());
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    Response {
        status,
        content_type,
        cors,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

#[tokio::test]
async fn test_bypath_bundles_in_request_order() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/bypath?lib/core.js,app/util.js").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("application/x-javascript"));
    assert_eq!(response.cors.as_deref(), Some("*"));

    let core = response.body.find("/*module: lib/core.js*/").unwrap();
    let util = response.body.find("/*module: app/util.js*/").unwrap();
    assert!(core < util);
    assert!(response.body.contains("'lib/core'"));
}

#[tokio::test]
async fn test_bypath_partial_miss_warns_inline() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/bypath?app/util.js,app/gone.js").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .body
        .contains("console.warn(\"[JetError] Fail to read the module file <app/gone.js> .\");"));
}

#[tokio::test]
async fn test_bypath_total_miss_is_not_found() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/bypath?app/gone.js,lib/gone.js").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bypath_rejects_escaping_paths() {
    let repo = sample_repo();
    std::fs::write(repo.path().join("secret.js"), "secret").unwrap();
    let response = get(app(&repo, false), "/bypath?../secret.js").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(!response.body.contains("secret\n"));
}

#[tokio::test]
async fn test_byid_serves_hashed_artifacts() {
    let repo = sample_repo();
    let response = get(app(&repo, true), "/byid?app/main,lib/core").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.matches("/*module: ").count(), 2);
    assert!(!response.body.contains("/*module: app/main.js*/"));
    assert!(response.body.contains("'lib/helper'"));
}

#[tokio::test]
async fn test_deps_by_ids() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/deps?ids=app/main").await;
    assert_eq!(response.status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["status"], 0);
    assert_eq!(json["data"]["app"]["map"]["app/main"]["a"][0], "app/lazy");
    assert_eq!(json["data"]["lib"]["map"]["lib/helper"]["p"], "lib/helper.js");
}

#[tokio::test]
async fn test_deps_by_packs_without_following() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/deps?packs=app&dep=0").await;

    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["status"], 0);
    assert!(json["data"]["app"].is_object());
    assert!(json["data"].get("lib").is_none());
}

#[tokio::test]
async fn test_deps_without_selector_reports_error() {
    let repo = sample_repo();
    let response = get(app(&repo, false), "/deps").await;

    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["status"], 1);
    assert!(json["info"].is_string());
}
